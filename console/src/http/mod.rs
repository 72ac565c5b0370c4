//! HTTP transport to the pipeline backend

pub mod catalog;
pub mod client;
pub mod deployments;

use async_trait::async_trait;

use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::models::deployment::{
    DeploymentRecord, DeploymentRequest, PrStatus, Service, SubmissionReceipt,
};
use crate::pipeline::Pipeline;

#[async_trait]
impl Pipeline for HttpClient {
    async fn list_services(&self) -> Result<Vec<Service>, ConsoleError> {
        self.get_services().await
    }

    async fn get_variable_schema(&self, service: &str) -> Result<Vec<String>, ConsoleError> {
        self.get_service_env_keys(service).await
    }

    async fn suggest_tags(
        &self,
        registry: &str,
        service: &str,
    ) -> Result<Vec<String>, ConsoleError> {
        self.get_suggested_tags(registry, service).await
    }

    async fn submit_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<SubmissionReceipt, ConsoleError> {
        self.create_deployment(request).await
    }

    async fn poll_pr_status(&self, pr_id: &str) -> Result<PrStatus, ConsoleError> {
        self.get_pr_status(pr_id).await
    }

    async fn poll_deploy_status(&self, tracking_id: &str) -> Result<Option<String>, ConsoleError> {
        self.get_deploy_status(tracking_id).await
    }

    async fn list_pending_approvals(&self) -> Result<Vec<DeploymentRecord>, ConsoleError> {
        self.get_deployments().await
    }

    async fn decide_approval(&self, tracking_id: &str, approved: bool) -> Result<(), ConsoleError> {
        self.approve_deployment(tracking_id, approved).await
    }
}
