//! Daemon configuration.
//!
//! One JSON config file; a missing file means defaults (both sinks disabled,
//! platform-default record store root), so the daemon can always start.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use findmy_sinks::{MqttSettings, WebhookSettings};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "FINDMY_BRIDGE_CONFIG";

const CONFIG_DIR: &str = "findmy-bridge";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Record store root; the platform default when absent.
    pub record_store: Option<PathBuf>,
    pub homeassistant: WebhookSettings,
    pub mqtt: MqttSettings,
}

impl BridgeConfig {
    /// Default config location: `<config_dir>/findmy-bridge/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Resolve the config path: CLI argument, then environment, then the
    /// platform default location.
    pub fn resolve_path(arg: Option<PathBuf>) -> Option<PathBuf> {
        arg.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(Self::default_path)
    }

    /// Load from `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults (sinks disabled)");
            return Ok(Self::default());
        }
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("invalid config file {}", path.display()))
    }
}
