use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tunedeck_client::catalog::{CatalogClient, CatalogLists};
use tunedeck_client::error::ClientError;
use tunedeck_client::remote::{http_client, RemoteClient};
use tunedeck_proto::catalog::{CatalogFilters, CatalogRequest, ListKind};
use tunedeck_proto::command::{CommandReply, PlayerCommand};
use tunedeck_proto::push::RepeatMode;

/// Everything the mock server was asked.
#[derive(Clone, Default)]
struct Recorder {
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    bodies: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Recorder {
    fn pages_requested(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter_map(|q| q.get("page").cloned())
            .collect()
    }

    fn body(&self, route: &str) -> Option<Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(r, _)| r == route)
            .map(|(_, b)| b.clone())
    }
}

/// 24 rows in total: pages 0 and 1 are full, page 2 holds 4 rows plus the
/// sentinel, anything later is only the sentinel.
async fn songmeta(
    State(rec): State<Recorder>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    rec.queries.lock().unwrap().push(params);

    let total = 24;
    let start = page * 10;
    let mut rows: Vec<Value> = (start..(start + 10).min(total))
        .map(|i| {
            json!({
                "artist": format!("Artist {:02}", i),
                "title": format!("Song {:02}", i),
                "path": format!("/music/{:02}.mp3", i),
                "tracknum": format!("{}", i + 1),
            })
        })
        .collect();
    if start + 10 >= total {
        rows.push(json!({ "eof": true }));
    }
    Json(Value::Array(rows))
}

/// Any POST whose JSON body should be kept for inspection.
async fn capture(State(rec): State<Recorder>, uri: Uri, Json(body): Json<Value>) -> StatusCode {
    rec.bodies
        .lock()
        .unwrap()
        .push((uri.path().to_string(), body));
    StatusCode::OK
}

async fn load(State(rec): State<Recorder>, Json(body): Json<Value>) -> Json<Value> {
    rec.bodies
        .lock()
        .unwrap()
        .push(("/player/load".to_string(), body));
    Json(json!({ "size": 1234 }))
}

async fn spawn_server() -> (String, Recorder) {
    let rec = Recorder::default();
    let app = Router::new()
        .route("/songmeta", get(songmeta))
        .route(
            "/player/volume",
            get(|| async { Json(json!({ "volume": 42 })) }).post(capture),
        )
        .route("/player/load", post(load))
        .route("/player/queue.move", post(capture))
        .route("/player/repeat_mode", post(capture))
        .route("/player/queue.clear", post(capture))
        .route("/player/play", get(|| async { StatusCode::OK }))
        .route(
            "/player/stop",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .with_state(rec.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), rec)
}

#[tokio::test]
async fn catalog_query_sends_list_parameters_and_detects_eof() {
    let (base, rec) = spawn_server().await;
    let client = CatalogClient::new(http_client().unwrap(), &base);

    let mut filters = CatalogFilters::default();
    filters.set(ListKind::Artist, "Art");
    let first = client
        .query(&CatalogRequest::new(ListKind::Title, 0, filters.clone()))
        .await
        .unwrap();
    assert_eq!(first.tracks.len(), 10);
    assert!(!first.is_last);
    assert_eq!(first.tracks[3].track_number(), Some(4));

    let params = rec.queries.lock().unwrap()[0].clone();
    assert_eq!(params.get("pagesize").map(String::as_str), Some("10"));
    assert_eq!(params.get("artist").map(String::as_str), Some("Art"));
    assert_eq!(params.get("album").map(String::as_str), Some(""));
    assert_eq!(params.get("order").map(String::as_str), Some("tracknum,title"));
    assert!(!params.contains_key("fields"));

    let last = client
        .query(&CatalogRequest::new(ListKind::Artist, 2, filters))
        .await
        .unwrap();
    assert!(last.is_last);
    assert_eq!(last.values(ListKind::Artist).len(), 4);
    let params = rec.queries.lock().unwrap()[1].clone();
    assert_eq!(params.get("fields").map(String::as_str), Some("artist"));
}

#[tokio::test]
async fn paging_never_requests_past_the_proven_last_page() {
    let (base, rec) = spawn_server().await;
    let client = CatalogClient::new(http_client().unwrap(), &base);
    let mut lists = CatalogLists::new(10);

    let initial = lists.refresh_all();
    let (request, seq) = initial
        .into_iter()
        .find(|(r, _)| r.list == ListKind::Title)
        .unwrap();
    let page = client.query(&request).await;
    lists.on_page(ListKind::Title, seq, page);

    for _ in 0..2 {
        let (request, seq) = lists.change_page(ListKind::Title, 1).unwrap();
        let page = client.query(&request).await;
        assert!(lists.on_page(ListKind::Title, seq, page).is_none());
    }
    assert_eq!(lists.paging(ListKind::Title).page(), 2);
    assert!(lists.paging(ListKind::Title).is_last());
    assert_eq!(lists.titles().len(), 4);

    // Page 5 was never proven to exist; the request is clamped away.
    assert!(lists.change_page(ListKind::Title, 3).is_none());
    assert_eq!(rec.pages_requested(), vec!["0", "1", "2"]);

    // Stepping back works and is remembered for the empty filter.
    let (request, _) = lists.change_page(ListKind::Title, -1).unwrap();
    assert_eq!(request.page, 1);
    assert_eq!(lists.memory(ListKind::Title).page_for(0), 1);
}

#[tokio::test]
async fn player_commands_hit_routes_with_expected_bodies() {
    let (base, rec) = spawn_server().await;
    let remote = RemoteClient::new(http_client().unwrap(), format!("{}/", base));

    assert_eq!(remote.get_volume().await.unwrap(), 42);
    assert_eq!(remote.load("/music/01.mp3").await.unwrap(), 1234);
    assert_eq!(
        rec.body("/player/load"),
        Some(json!({ "File": "/music/01.mp3" }))
    );

    let reply = remote.execute(&PlayerCommand::SetVolume(55)).await.unwrap();
    assert_eq!(reply, CommandReply::Done);
    assert_eq!(rec.body("/player/volume"), Some(json!({ "Volume": 55 })));

    remote
        .execute(&PlayerCommand::Move {
            indexes: vec![1, 4],
            delta: 1,
        })
        .await
        .unwrap();
    assert_eq!(
        rec.body("/player/queue.move"),
        Some(json!({ "Indexes": [1, 4], "Delta": 1 }))
    );

    remote
        .execute(&PlayerCommand::SetRepeatMode(RepeatMode::RepeatOne))
        .await
        .unwrap();
    assert_eq!(
        rec.body("/player/repeat_mode"),
        Some(json!({ "Mode": "RepeatOne" }))
    );

    remote.execute(&PlayerCommand::ClearQueue).await.unwrap();
    assert_eq!(rec.body("/player/queue.clear"), Some(json!({})));

    remote.execute(&PlayerCommand::Play).await.unwrap();
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let (base, _rec) = spawn_server().await;
    let remote = RemoteClient::new(http_client().unwrap(), base);

    match remote.execute(&PlayerCommand::Stop).await {
        Err(ClientError::Status { route, status }) => {
            assert_eq!(route, "/player/stop");
            assert_eq!(status, 500);
        }
        other => panic!("expected status error, got {:?}", other),
    }
}
