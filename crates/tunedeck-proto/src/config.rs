use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Where the remote player service lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL for the catalog and player command endpoints.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the push-event websocket, relative to `base_url`.
    #[serde(default = "default_events_path")]
    pub events_path: String,
}

/// Timing knobs for the synchronization layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Quiet period before a throttled control (volume, seek) is sent.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// How long stale position echoes are suppressed after a seek.
    #[serde(default = "default_seek_grace_ms")]
    pub seek_grace_ms: u64,
    /// Fixed delay between a push-channel drop and the next connect attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Rows per catalog page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl SyncConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn seek_grace(&self) -> Duration {
        Duration::from_millis(self.seek_grace_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl ServerConfig {
    /// Websocket URL of the push channel (`http` → `ws`, `https` → `wss`).
    pub fn events_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/{}", ws_base, self.events_path.trim_start_matches('/'))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            events_path: default_events_path(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            seek_grace_ms: default_seek_grace_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            page_size: default_page_size(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:2001".to_string()
}

fn default_events_path() -> String {
    "/playerEvents".to_string()
}

fn default_throttle_ms() -> u64 {
    80
}

fn default_seek_grace_ms() -> u64 {
    1000
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_page_size() -> usize {
    crate::catalog::PAGE_SIZE
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`, writing the defaults there first if it doesn't exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
