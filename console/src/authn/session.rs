//! Session authentication shared by every outbound request

use std::sync::RwLock;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::errors::ConsoleError;

/// Environment variable the session token is read from at start-up
pub const TOKEN_ENV_VAR: &str = "DEPLOYCTL_TOKEN";

/// Process-scoped holder of the operator's bearer token.
///
/// Configured once per session and updated in place; request builders read
/// it on every call instead of registering their own copy.
#[derive(Default)]
pub struct SessionAuth {
    token: RwLock<Option<SecretString>>,
}

impl SessionAuth {
    /// Create an unauthorized session
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with a token already set
    pub fn with_token(token: impl Into<String>) -> Self {
        let auth = Self::new();
        auth.set_token(token);
        auth
    }

    /// Load the token from the environment, if present
    pub fn from_env() -> Self {
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.trim().is_empty() => {
                info!("Session token loaded from {}", TOKEN_ENV_VAR);
                Self::with_token(token.trim())
            }
            _ => {
                debug!("{} not set, session is unauthorized", TOKEN_ENV_VAR);
                Self::new()
            }
        }
    }

    /// Replace the current token
    pub fn set_token(&self, token: impl Into<String>) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(SecretString::from(token.into()));
    }

    /// Forget the current token
    pub fn clear(&self) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    pub fn is_authorized(&self) -> bool {
        let slot = self.token.read().unwrap_or_else(|e| e.into_inner());
        slot.is_some()
    }

    /// `Authorization` header value for the current token
    pub fn bearer(&self) -> Result<String, ConsoleError> {
        let slot = self.token.read().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(token) => Ok(format!("Bearer {}", token.expose_secret())),
            None => Err(ConsoleError::Unauthorized),
        }
    }
}
