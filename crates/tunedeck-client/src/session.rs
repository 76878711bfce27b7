//! The session loop: one task that owns `ViewState` and feeds it.
//!
//! Push events, HTTP results, throttle deadlines and user intents all arrive
//! here and are applied in order, so nothing else needs a lock. Requests are
//! run on spawned tasks whose results come back as `SessionMessage`s. After
//! every input the fresh snapshot is published on a `watch` channel.

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tunedeck_proto::catalog::{CatalogPage, ListKind};
use tunedeck_proto::command::{CommandReply, PlayerCommand};
use tunedeck_proto::config::Config;

use crate::catalog::CatalogClient;
use crate::error::ClientError;
use crate::event_channel::{run_event_channel, ChannelEvent};
use crate::remote::{http_client, RemoteClient};
use crate::view_state::{Effect, Intent, ViewSnapshot, ViewState};

/// Results of work the session spawned.
#[derive(Debug)]
enum SessionMessage {
    CommandDone(PlayerCommand, Result<CommandReply, ClientError>),
    PageLoaded(ListKind, u64, Result<CatalogPage, ClientError>),
}

/// The caller's side of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    intents: mpsc::Sender<Intent>,
    snapshots: watch::Receiver<ViewSnapshot>,
    cancel: CancellationToken,
}

impl SessionHandle {
    /// Returns `false` once the session has ended.
    pub async fn send(&self, intent: Intent) -> bool {
        self.intents.send(intent).await.is_ok()
    }

    pub fn snapshots(&self) -> watch::Receiver<ViewSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

pub struct Session {
    view: ViewState,
    remote: RemoteClient,
    catalog: CatalogClient,
    events_url: String,
    reconnect_delay: Duration,
    intents: mpsc::Receiver<Intent>,
    snapshot_tx: watch::Sender<ViewSnapshot>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(config: &Config) -> Result<(Self, SessionHandle), ClientError> {
        let http = http_client()?;
        let view = ViewState::new(&config.sync);
        let (intent_tx, intent_rx) = mpsc::channel(256);
        let (snapshot_tx, snapshot_rx) = watch::channel(view.snapshot());
        let cancel = CancellationToken::new();

        let session = Self {
            view,
            remote: RemoteClient::new(http.clone(), config.server.base_url.clone()),
            catalog: CatalogClient::new(http, config.server.base_url.clone()),
            events_url: config.server.events_url(),
            reconnect_delay: config.sync.reconnect_delay(),
            intents: intent_rx,
            snapshot_tx,
            cancel: cancel.clone(),
        };
        let handle = SessionHandle {
            intents: intent_tx,
            snapshots: snapshot_rx,
            cancel,
        };
        Ok((session, handle))
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<SessionMessage>(1024);
        let (channel_tx, mut channel_rx) = mpsc::channel::<ChannelEvent>(1024);

        // ── Push channel ──────────────────────────────────────────────────────
        tokio::spawn(run_event_channel(
            self.events_url.clone(),
            self.reconnect_delay,
            channel_tx,
            self.cancel.child_token(),
        ));
        info!("session started; events at {}", self.events_url);

        // ── Initial data load ─────────────────────────────────────────────────
        let effects = self.view.apply_intent(Intent::RefreshCatalog, Instant::now());
        self.execute(effects, &tx);
        self.execute(vec![Effect::Command(PlayerCommand::GetVolume)], &tx);
        self.publish();

        // ── Main loop ─────────────────────────────────────────────────────────
        loop {
            let deadline = self.view.next_deadline();

            tokio::select! {
                _ = self.cancel.cancelled() => break,

                Some(event) = channel_rx.recv() => {
                    let effects = match event {
                        ChannelEvent::StateChanged(state) => self.view.set_connection(state),
                        ChannelEvent::Message(msg) => self.view.apply_push(&msg, Instant::now()),
                    };
                    self.execute(effects, &tx);
                }

                Some(msg) = rx.recv() => {
                    let effects = match msg {
                        SessionMessage::CommandDone(command, result) => {
                            self.view.on_command_result(&command, result);
                            Vec::new()
                        }
                        SessionMessage::PageLoaded(list, seq, result) => {
                            self.view.on_catalog_page(list, seq, result)
                        }
                    };
                    self.execute(effects, &tx);
                }

                intent = self.intents.recv() => {
                    let Some(intent) = intent else {
                        debug!("all session handles dropped");
                        break;
                    };
                    let effects = self.view.apply_intent(intent, Instant::now());
                    self.execute(effects, &tx);
                }

                _ = sleep_until(deadline) => {
                    let effects = self.view.poll_timers(Instant::now());
                    self.execute(effects, &tx);
                }
            }

            self.publish();
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        self.cancel.cancel();
        info!("session stopped");
        Ok(())
    }

    /// Spawn the requests in `effects`. Commands from one batch run in
    /// order on a single task; catalog queries run independently.
    fn execute(&self, effects: Vec<Effect>, tx: &mpsc::Sender<SessionMessage>) {
        let mut commands = Vec::new();
        for effect in effects {
            match effect {
                Effect::Command(command) => commands.push(command),
                Effect::Query(request, seq) => {
                    let catalog = self.catalog.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let result = catalog.query(&request).await;
                        let _ = tx
                            .send(SessionMessage::PageLoaded(request.list, seq, result))
                            .await;
                    });
                }
            }
        }

        if commands.is_empty() {
            return;
        }
        let remote = self.remote.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            for command in commands {
                let result = remote.execute(&command).await;
                if tx
                    .send(SessionMessage::CommandDone(command, result))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.view.snapshot());
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}
