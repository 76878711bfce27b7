use std::path::PathBuf;

use clap::Parser;
use tunedeck_client::view_state::{Intent, ViewSnapshot};
use tunedeck_client::Session;
use tunedeck_proto::catalog::ListKind;
use tunedeck_proto::config::Config;

/// Headless tunedeck session: mirrors a remote player and logs what it sees.
#[derive(Parser, Debug)]
#[command(name = "tunedeck", version, about)]
struct Args {
    /// Player base URL (overrides the config file)
    #[arg(long)]
    server: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log to stderr instead of the log file
    #[arg(long)]
    stderr: bool,

    /// Initial artist filter
    #[arg(long)]
    filter_artist: Option<String>,

    /// Initial album filter
    #[arg(long)]
    filter_album: Option<String>,

    /// Initial title filter
    #[arg(long)]
    filter_title: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Allow RUST_LOG override; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "debug,hyper_util=warn,reqwest=warn,hyper=warn,tungstenite=warn".to_string()
    });
    if args.stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(log_filter.as_str())
            .init();
    } else {
        let data_dir = tunedeck_proto::platform::data_dir();
        std::fs::create_dir_all(&data_dir)?;
        let log_path = data_dir.join("tunedeck.log");
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_env_filter(log_filter.as_str())
            .with_ansi(false)
            .init();
        // Print log path to stderr so the operator can tail it immediately.
        eprintln!("tunedeck log: {}", log_path.display());
    }

    // ── Load config ──────────────────────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("config unreadable, using defaults: {}", e);
            Config::default()
        }),
    };
    if let Some(server) = args.server {
        config.server.base_url = server;
    }
    tracing::info!("tunedeck starting against {}", config.server.base_url);

    // ── Session ──────────────────────────────────────────────────────────────
    let (session, handle) = Session::new(&config)?;
    let runner = tokio::spawn(session.run());

    let filters = [
        (ListKind::Artist, args.filter_artist),
        (ListKind::Album, args.filter_album),
        (ListKind::Title, args.filter_title),
    ];
    for (list, text) in filters {
        if let Some(text) = text {
            handle.send(Intent::SetFilter(list, text)).await;
        }
    }

    // ── Mirror logger ────────────────────────────────────────────────────────
    let mut snapshots = handle.snapshots();
    tokio::spawn(async move {
        let mut last = Summary::default();
        while snapshots.changed().await.is_ok() {
            let summary = Summary::from(&*snapshots.borrow_and_update());
            if summary != last {
                tracing::info!("{}", summary);
                last = summary;
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupted; shutting down");
    handle.shutdown();
    runner.await??;

    Ok(())
}

/// The parts of a snapshot worth a log line when they change.
#[derive(Debug, Default, PartialEq)]
struct Summary {
    connected: bool,
    state: String,
    track: String,
    volume: u8,
    repeat: String,
    queue: usize,
    recent: usize,
    scanning: bool,
    pages: [usize; 3],
}

impl From<&ViewSnapshot> for Summary {
    fn from(snap: &ViewSnapshot) -> Self {
        Self {
            connected: snap.connected,
            state: snap.state.to_string(),
            track: snap
                .now_playing
                .as_ref()
                .map(|n| n.track.display_name())
                .unwrap_or_default(),
            volume: snap.volume,
            repeat: snap.repeat_mode.to_string(),
            queue: snap.queue.rows.len(),
            recent: snap.recent.rows.len(),
            scanning: snap.scan_active,
            pages: [snap.artists.page, snap.albums.page, snap.titles.page],
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} {:?} vol={} repeat={} queue={} recent={} pages={:?}{}",
            if self.connected { "online" } else { "offline" },
            self.state,
            self.track,
            self.volume,
            self.repeat,
            self.queue,
            self.recent,
            self.pages,
            if self.scanning { " scanning" } else { "" }
        )
    }
}
