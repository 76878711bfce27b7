use std::time::Duration;

use tracing::debug;
use tunedeck_proto::command::{CommandReply, Method, PlayerCommand};

use crate::error::ClientError;

/// Shared HTTP client for the command and catalog endpoints.
pub fn http_client() -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(15))
        .build()?)
}

/// Runs player commands against the remote service.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn execute(&self, command: &PlayerCommand) -> Result<CommandReply, ClientError> {
        let url = format!("{}{}", self.base_url, command.route());
        debug!("remote: {}", command);

        let request = match command.method() {
            Method::Get => self.http.get(&url),
            Method::Post => match command.body() {
                Some(body) => self.http.post(&url).json(&body),
                None => self.http.post(&url),
            },
        };
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                route: command.route().to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        Ok(command.parse_reply(&body)?)
    }

    pub async fn get_volume(&self) -> Result<u8, ClientError> {
        match self.execute(&PlayerCommand::GetVolume).await? {
            CommandReply::Volume(volume) => Ok(volume),
            _ => Ok(0),
        }
    }

    /// Load `path` into the player; returns the new track's size in position
    /// units.
    pub async fn load(&self, path: &str) -> Result<i64, ClientError> {
        let command = PlayerCommand::Load {
            path: path.to_string(),
        };
        match self.execute(&command).await? {
            CommandReply::Loaded { size } => Ok(size),
            _ => Ok(0),
        }
    }
}
