//! Server configuration, loaded from `lycan.toml` plus env overrides.

use std::path::Path;
use std::time::Duration;

use lycan_room::RoomConfig;
use serde::Deserialize;

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// How long a new connection has to send its `hello`.
    pub handshake_timeout_ms: u64,
    /// Close connections silent for this long. 0 disables.
    pub idle_timeout_secs: u64,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            handshake_timeout_ms: 5000,
            idle_timeout_secs: 60,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Config file read when `LYCAN_CONFIG` is unset.
    pub const DEFAULT_PATH: &'static str = "lycan.toml";

    /// Load config from `LYCAN_CONFIG` (or `lycan.toml`) if it exists,
    /// then apply env var overrides.
    pub fn load() -> Self {
        let path = std::env::var("LYCAN_CONFIG")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_PATH.to_string());

        let mut config = Self::from_file(&path);
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Reads a TOML file. A missing or unparseable file yields defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "loaded configuration");
                    cfg
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to parse config, using defaults"
                    );
                    ServerConfig::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                ServerConfig::default()
            }
        }
    }

    /// Applies `LYCAN_LISTEN_ADDR` and `LYCAN_EXTRA_ROLE_SLOTS` as read by
    /// `lookup`. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("LYCAN_LISTEN_ADDR").filter(|a| !a.is_empty()) {
            self.listen_addr = addr;
        }
        if let Some(raw) = lookup("LYCAN_EXTRA_ROLE_SLOTS").filter(|s| !s.is_empty()) {
            match raw.parse() {
                Ok(slots) => self.room.extra_role_slots = slots,
                Err(e) => tracing::warn!(
                    value = %raw,
                    error = %e,
                    "ignoring invalid LYCAN_EXTRA_ROLE_SLOTS"
                ),
            }
        }
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// `None` when idle connections are never closed.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}
