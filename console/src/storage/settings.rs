//! Settings file management

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::errors::ConsoleError;
use crate::logs::LogLevel;
use crate::wizard::schema::DEFAULT_REGISTRY;

/// Console settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON logs on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Also write daily-rolling log files under the storage directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Image registry queried for tag suggestions
    #[serde(default = "default_registry")]
    pub registry: String,

    /// Status tracking configuration
    #[serde(default)]
    pub status: StatusSettings,
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults
    pub async fn load(path: &Path) -> Result<Self, ConsoleError> {
        match fs::read_to_string(path).await {
            Ok(contents) => {
                let settings = serde_json::from_str(&contents)?;
                debug!("Settings loaded from {}", path.display());
                Ok(settings)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write settings to `path`, replacing any previous file in one step
    pub async fn save(&self, path: &Path) -> Result<(), ConsoleError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(self)?).await?;
        fs::rename(&staging, path).await?;

        info!("Settings written to {}", path.display());
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_registry() -> String {
    DEFAULT_REGISTRY.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_to_file: false,
            backend: BackendSettings::default(),
            registry: default_registry(),
            status: StatusSettings::default(),
        }
    }
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL for the backend API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Base URL of the status WebSocket; derived from `base_url` if absent
    #[serde(default)]
    pub push_url: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            push_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl BackendSettings {
    /// Push channel base URL
    pub fn push_base_url(&self) -> &str {
        self.push_url.as_deref().unwrap_or(&self.base_url)
    }
}

/// Status tracking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSettings {
    /// Polling interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Keep polling while the push channel is up
    #[serde(default = "default_true")]
    pub poll_while_connected: bool,

    /// First reconnect delay in seconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// Reconnect backoff cap in seconds
    #[serde(default = "default_reconnect_max_delay")]
    pub reconnect_max_delay_secs: u64,

    /// Push channel handshake timeout in seconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_reconnect_max_delay() -> u64 {
    60
}

fn default_handshake_timeout() -> u64 {
    10
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            poll_while_connected: true,
            reconnect_delay_secs: default_reconnect_delay(),
            reconnect_max_delay_secs: default_reconnect_max_delay(),
            handshake_timeout_secs: default_handshake_timeout(),
        }
    }
}
