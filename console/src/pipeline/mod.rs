//! Collaborator contracts of the external deployment pipeline

pub mod push;

use async_trait::async_trait;
use futures::stream::BoxStream;

use openapi_client::models::StatusPushMessage;

use crate::errors::{ChannelError, ConsoleError};
use crate::models::deployment::{
    DeploymentRecord, DeploymentRequest, PrStatus, Service, SubmissionReceipt,
};

/// Request/response operations of the pipeline backend
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Deployable services
    async fn list_services(&self) -> Result<Vec<Service>, ConsoleError>;

    /// Recognized environment-variable keys of a service
    async fn get_variable_schema(&self, service: &str) -> Result<Vec<String>, ConsoleError>;

    /// Image tags suggested by the registry
    async fn suggest_tags(&self, registry: &str, service: &str)
        -> Result<Vec<String>, ConsoleError>;

    /// Trigger the pipeline for a finished request
    async fn submit_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<SubmissionReceipt, ConsoleError>;

    /// Pull-request status
    async fn poll_pr_status(&self, pr_id: &str) -> Result<PrStatus, ConsoleError>;

    /// Deployment status, `None` if the pipeline reports nothing yet
    async fn poll_deploy_status(&self, tracking_id: &str) -> Result<Option<String>, ConsoleError>;

    /// Deployments known to the pipeline
    async fn list_pending_approvals(&self) -> Result<Vec<DeploymentRecord>, ConsoleError>;

    /// Approve or reject a deployment
    async fn decide_approval(&self, tracking_id: &str, approved: bool) -> Result<(), ConsoleError>;
}

/// Inbound push messages; the stream ends when the server closes it
pub type PushStream = BoxStream<'static, Result<StatusPushMessage, ChannelError>>;

/// Server-initiated status stream keyed by tracking id
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Perform the handshake and return the message stream
    async fn open(&self, tracking_id: &str) -> Result<PushStream, ChannelError>;
}
