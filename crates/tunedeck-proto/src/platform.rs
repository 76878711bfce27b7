//! Per-user locations for the config file and the session log.

use std::path::PathBuf;

const APP_DIR: &str = "tunedeck";

/// Overrides both directories when set. Handy for running several sessions
/// against different players side by side.
pub const HOME_ENV: &str = "TUNEDECK_HOME";

fn home_override() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Where `tunedeck.log` is written.
pub fn data_dir() -> PathBuf {
    if let Some(home) = home_override() {
        return home;
    }
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Where `config.toml` is looked up.
pub fn config_dir() -> PathBuf {
    if let Some(home) = home_override() {
        return home;
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
