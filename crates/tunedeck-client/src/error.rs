use thiserror::Error;

/// Failures talking to the remote service. None of these are fatal to a
/// session; callers log them and keep the last known state.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{route} returned status {status}")]
    Status { route: String, status: u16 },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// True for failures that say nothing about the request itself (the
    /// server was unreachable or timed out).
    pub fn is_transport(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_connect() || e.is_timeout(),
            ClientError::WebSocket(_) => true,
            _ => false,
        }
    }
}
