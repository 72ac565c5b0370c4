//! Application configuration options

use std::time::Duration;

use crate::status::engine::EngineOptions;
use crate::storage::settings::Settings;
use crate::utils::BackoffOptions;
use crate::wizard::schema::DEFAULT_REGISTRY;
use crate::workers::{poller, relay};

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Backend API base URL
    pub backend_base_url: String,

    /// Status WebSocket base URL
    pub push_base_url: String,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Registry queried for tag suggestions
    pub registry: String,

    /// Status engine options
    pub engine: EngineOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            backend_base_url: "http://localhost:8000".to_string(),
            push_base_url: "ws://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            registry: DEFAULT_REGISTRY.to_string(),
            engine: EngineOptions::default(),
        }
    }
}

/// Timings below one second busy-loop the workers or fail every request
fn at_least_one_sec(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

impl AppOptions {
    /// Build options from the settings file
    pub fn from_settings(settings: &Settings) -> Self {
        let status = &settings.status;
        Self {
            backend_base_url: settings.backend.base_url.clone(),
            push_base_url: settings.backend.push_base_url().to_string(),
            request_timeout: at_least_one_sec(settings.backend.request_timeout_secs),
            registry: settings.registry.clone(),
            engine: EngineOptions {
                relay: relay::Options {
                    handshake_timeout: at_least_one_sec(status.handshake_timeout_secs),
                    reconnect: BackoffOptions {
                        base_delay: at_least_one_sec(status.reconnect_delay_secs),
                        max_delay: at_least_one_sec(
                            status
                                .reconnect_max_delay_secs
                                .max(status.reconnect_delay_secs),
                        ),
                        ..Default::default()
                    },
                },
                poller: poller::Options {
                    interval: at_least_one_sec(status.poll_interval_secs),
                    poll_while_connected: status.poll_while_connected,
                },
            },
        }
    }
}
