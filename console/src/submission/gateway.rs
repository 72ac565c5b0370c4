//! Submission gateway to the pipeline trigger

use std::sync::Arc;

use tracing::{error, info};

use crate::errors::SubmissionError;
use crate::models::deployment::{DeploymentRequest, SubmissionReceipt};
use crate::pipeline::Pipeline;

/// Sends finished requests to the pipeline trigger.
///
/// One call per request; retrying is left to the operator since the
/// pipeline does not promise idempotent submissions.
pub struct SubmissionGateway {
    pipeline: Arc<dyn Pipeline>,
}

impl SubmissionGateway {
    pub fn new(pipeline: Arc<dyn Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Submit a request and return the PR reference and tracking id
    pub async fn submit(
        &self,
        request: &DeploymentRequest,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        info!("Submitting deployment: {:?}", request);

        match self.pipeline.submit_deployment(request).await {
            Ok(receipt) => {
                info!(
                    "Deployment {} accepted, pull request: {}",
                    receipt.tracking_id, receipt.pr_reference
                );
                Ok(receipt)
            }
            Err(e) => {
                error!(
                    "Deployment of {}:{} to {} failed: {}",
                    request.service(),
                    request.tag(),
                    request.env(),
                    e
                );
                Err(SubmissionError(e))
            }
        }
    }
}
