//! Deployment API client

use openapi_client::models::{
    ApproveRequest, DeployResponse, DeployStatusResponse, DeploymentListResponse,
    PrStatusResponse,
};

use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::models::deployment::{DeploymentRecord, DeploymentRequest, PrStatus, SubmissionReceipt};

impl HttpClient {
    /// Trigger the pipeline for a deployment request
    pub async fn create_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<SubmissionReceipt, ConsoleError> {
        let response: DeployResponse = self.post(&["deploy"], &request.to_wire()).await?;
        Ok(SubmissionReceipt {
            pr_reference: response.pr_url,
            tracking_id: response.deploy_id,
        })
    }

    /// Get pull-request status
    pub async fn get_pr_status(&self, pr_id: &str) -> Result<PrStatus, ConsoleError> {
        let response: PrStatusResponse = self.get(&["pr-status", pr_id]).await?;
        Ok(PrStatus {
            merged: response.merged,
            status: response.status,
        })
    }

    /// Get deployment status
    pub async fn get_deploy_status(&self, deploy_id: &str) -> Result<Option<String>, ConsoleError> {
        let response: DeployStatusResponse = self.get(&["deploy-status", deploy_id]).await?;
        Ok(response.status)
    }

    /// List deployments known to the pipeline
    pub async fn get_deployments(&self) -> Result<Vec<DeploymentRecord>, ConsoleError> {
        let response: DeploymentListResponse = self.get(&["deployments"]).await?;
        Ok(response
            .deployments
            .into_iter()
            .map(DeploymentRecord::from_wire)
            .collect())
    }

    /// Approve or reject a deployment
    pub async fn approve_deployment(
        &self,
        deploy_id: &str,
        approved: bool,
    ) -> Result<(), ConsoleError> {
        let body = ApproveRequest {
            deploy_id: deploy_id.to_string(),
            approved,
        };
        let _: serde_json::Value = self.post(&["approve"], &body).await?;
        Ok(())
    }
}
