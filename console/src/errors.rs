//! Error types for the deployment console

use thiserror::Error;

/// Main error type for the deployment console
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Backend rejected request: {status} - {body}")]
    BackendError { status: u16, body: String },

    #[error("Not yet authorized: no session token")]
    Unauthorized,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ConsoleError {
    fn from(err: anyhow::Error) -> Self {
        ConsoleError::Internal(err.to_string())
    }
}

/// Variable schema could not be fetched. Never fatal: the resolver falls
/// back to an empty schema.
#[derive(Error, Debug)]
#[error("Schema fetch failed for '{service}': {source}")]
pub struct SchemaFetchError {
    pub service: String,
    #[source]
    pub source: ConsoleError,
}

/// The pipeline did not accept a deployment request.
///
/// Unreachable collaborator, validation rejection and expired auth all
/// surface as this one kind.
#[derive(Error, Debug)]
#[error("Submission failed: {0}")]
pub struct SubmissionError(#[source] pub ConsoleError);

/// Status transport failure; triggers reconnect or poll fallback.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(std::time::Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed message: {0}")]
    Malformed(String),
}

impl From<ChannelError> for ConsoleError {
    fn from(err: ChannelError) -> Self {
        ConsoleError::ChannelError(err.to_string())
    }
}

/// An approve/reject action was not applied; the record stays queued.
#[derive(Error, Debug)]
#[error("Approval action on '{deploy_id}' failed: {source}")]
pub struct ApprovalActionError {
    pub deploy_id: String,
    #[source]
    pub source: ConsoleError,
}

/// Wizard guard failures
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Invalid variable key: '{0}'")]
    InvalidKey(String),

    #[error("Variable key already present: {0}")]
    DuplicateKey(String),

    #[error("Unknown variable key: {0}")]
    UnknownKey(String),

    #[error("Cannot {action} in stage {stage:?}")]
    WrongStage {
        stage: crate::wizard::fsm::WizardStage,
        action: &'static str,
    },

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}
