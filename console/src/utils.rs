//! Utility functions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Build metadata of the console
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("DEPLOYCTL_GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("DEPLOYCTL_BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Reconnect delay policy
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffOptions {
    /// Delay after the first failure
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for BackoffOptions {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

/// Exponential backoff over consecutive failures
#[derive(Debug, Clone)]
pub struct Backoff {
    options: BackoffOptions,
    failures: u32,
}

impl Backoff {
    pub fn new(options: BackoffOptions) -> Self {
        Self {
            options,
            failures: 0,
        }
    }

    /// Delay before the next attempt; each call counts one more failure
    pub fn next_delay(&mut self) -> Duration {
        let exponent = self.failures.min(i32::MAX as u32) as i32;
        self.failures = self.failures.saturating_add(1);

        let max = self.options.max_delay.as_secs_f64();
        let delay = self.options.base_delay.as_secs_f64() * self.options.multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(max))
    }

    /// Forget past failures after a success
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
