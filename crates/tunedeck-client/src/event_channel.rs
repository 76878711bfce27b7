//! The push-event websocket.
//!
//! # States
//! ```text
//!  Connecting ──ready──▶ Open ──close / error──▶ ClosedRetrying
//!      ▲                                              │
//!      └──────────────── fixed delay ─────────────────┘
//! ```
//!
//! Retries are unbounded and the delay never grows. `ChannelStateMachine`
//! holds the transitions; `run_event_channel` is the one loop that drives it
//! against a real socket until its `CancellationToken` fires.

use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tunedeck_proto::push::PushMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    ClosedRetrying,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// What the driver reports to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    StateChanged(ConnectionState),
    Message(PushMessage),
}

#[derive(Debug, Clone)]
pub struct ChannelStateMachine {
    state: ConnectionState,
    delay: Duration,
    retry_at: Option<Instant>,
    attempts: u64,
    last_close_reason: Option<String>,
}

impl ChannelStateMachine {
    pub fn new(delay: Duration) -> Self {
        Self {
            state: ConnectionState::Connecting,
            delay,
            retry_at: None,
            attempts: 0,
            last_close_reason: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connection attempts started so far, including the first.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn last_close_reason(&self) -> Option<&str> {
        self.last_close_reason.as_deref()
    }

    pub fn connect_started(&mut self) {
        self.state = ConnectionState::Connecting;
        self.retry_at = None;
        self.attempts += 1;
    }

    pub fn opened(&mut self) {
        self.state = ConnectionState::Open;
    }

    /// A close or error, from either `Connecting` or `Open`.
    pub fn closed(&mut self, now: Instant, reason: impl Into<String>) {
        self.state = ConnectionState::ClosedRetrying;
        self.retry_at = Some(now + self.delay);
        self.last_close_reason = Some(reason.into());
    }

    pub fn retry_at(&self) -> Option<Instant> {
        match self.state {
            ConnectionState::ClosedRetrying => self.retry_at,
            _ => None,
        }
    }

    pub fn retry_due(&self, now: Instant) -> bool {
        self.retry_at().is_some_and(|at| now >= at)
    }
}

enum StreamEnd {
    Closed(String),
    Cancelled,
    ReceiverGone,
}

/// Keep a push connection to `url` alive until `cancel` fires or the
/// receiving side of `tx` is dropped.
pub async fn run_event_channel(
    url: String,
    reconnect_delay: Duration,
    tx: mpsc::Sender<ChannelEvent>,
    cancel: CancellationToken,
) {
    let mut machine = ChannelStateMachine::new(reconnect_delay);

    loop {
        machine.connect_started();
        if tx
            .send(ChannelEvent::StateChanged(machine.state()))
            .await
            .is_err()
        {
            return;
        }
        debug!("event channel: connecting to {} (attempt {})", url, machine.attempts());

        let connect = tokio::select! {
            _ = cancel.cancelled() => return,
            r = tokio_tungstenite::connect_async(url.as_str()) => r,
        };

        let reason = match connect {
            Ok((ws, _)) => {
                machine.opened();
                info!("event channel open: {}", url);
                if tx
                    .send(ChannelEvent::StateChanged(machine.state()))
                    .await
                    .is_err()
                {
                    return;
                }
                match pump(ws, &tx, &cancel).await {
                    StreamEnd::Closed(reason) => reason,
                    StreamEnd::Cancelled | StreamEnd::ReceiverGone => return,
                }
            }
            Err(e) => e.to_string(),
        };

        machine.closed(Instant::now(), reason);
        info!(
            "event channel closed ({}); retrying in {:?}",
            machine.last_close_reason().unwrap_or("unknown"),
            reconnect_delay
        );
        if tx
            .send(ChannelEvent::StateChanged(machine.state()))
            .await
            .is_err()
        {
            return;
        }

        let Some(retry_at) = machine.retry_at() else {
            continue;
        };
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep_until(tokio::time::Instant::from_std(retry_at)) => {}
        }
    }
}

async fn pump<S>(
    mut ws: tokio_tungstenite::WebSocketStream<S>,
    tx: &mpsc::Sender<ChannelEvent>,
    cancel: &CancellationToken,
) -> StreamEnd
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws.close(None).await;
                return StreamEnd::Cancelled;
            }
            frame = ws.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => match PushMessage::decode(&text) {
                Ok(msg) if msg.is_empty() && msg.error.is_none() => {
                    debug!("event channel: empty push ignored");
                }
                Ok(msg) => {
                    if tx.send(ChannelEvent::Message(msg)).await.is_err() {
                        return StreamEnd::ReceiverGone;
                    }
                }
                Err(e) => {
                    error!("event channel: undecodable push skipped: {}", e);
                }
            },
            Some(Ok(Message::Close(frame))) => {
                let reason = frame
                    .map(|f| format!("closed by server: {}", f.reason))
                    .unwrap_or_else(|| "closed by server".to_string());
                return StreamEnd::Closed(reason);
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("event channel error: {}", e);
                return StreamEnd::Closed(e.to_string());
            }
            None => return StreamEnd::Closed("stream ended".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1000);

    #[test]
    fn test_starts_connecting() {
        let machine = ChannelStateMachine::new(DELAY);
        assert_eq!(machine.state(), ConnectionState::Connecting);
        assert_eq!(machine.retry_at(), None);
    }

    #[test]
    fn test_close_schedules_retry_after_fixed_delay() {
        let t0 = Instant::now();
        let mut machine = ChannelStateMachine::new(DELAY);
        machine.connect_started();
        machine.opened();
        assert!(machine.state().is_open());

        machine.closed(t0, "reset");
        assert_eq!(machine.state(), ConnectionState::ClosedRetrying);
        assert!(!machine.retry_due(t0 + Duration::from_millis(999)));
        assert!(machine.retry_due(t0 + DELAY));
        assert_eq!(machine.last_close_reason(), Some("reset"));
    }

    #[test]
    fn test_retries_forever_without_backoff() {
        let mut now = Instant::now();
        let mut machine = ChannelStateMachine::new(DELAY);
        for attempt in 1..=50u64 {
            machine.connect_started();
            assert_eq!(machine.attempts(), attempt);
            if attempt % 2 == 0 {
                machine.opened();
            }
            machine.closed(now, "refused");
            assert_eq!(machine.retry_at(), Some(now + DELAY));
            now += DELAY;
            assert!(machine.retry_due(now));
        }
    }

    #[test]
    fn test_connect_clears_retry() {
        let t0 = Instant::now();
        let mut machine = ChannelStateMachine::new(DELAY);
        machine.closed(t0, "refused");
        machine.connect_started();
        assert_eq!(machine.retry_at(), None);
        assert!(!machine.retry_due(t0 + DELAY * 5));
    }
}
