//! Deployments awaiting a human decision

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::{error, info, warn};

use crate::errors::{ApprovalActionError, ConsoleError};
use crate::models::deployment::{DeploymentRecord, DeploymentStatus};
use crate::pipeline::Pipeline;

/// Local view of the pipeline's pending approvals.
///
/// Decided records are removed optimistically and never re-listed by this
/// queue, even if the pipeline still reports them as pending.
pub struct ApprovalQueue {
    pipeline: Arc<dyn Pipeline>,
    pending: RwLock<Vec<DeploymentRecord>>,
    decided: RwLock<HashSet<String>>,
}

impl ApprovalQueue {
    pub fn new(pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            pipeline,
            pending: RwLock::new(Vec::new()),
            decided: RwLock::new(HashSet::new()),
        }
    }

    /// Fetch pending deployments from the pipeline and refresh the view
    pub async fn list_pending(&self) -> Result<Vec<DeploymentRecord>, ConsoleError> {
        let records = self.pipeline.list_pending_approvals().await?;

        let fresh: Vec<DeploymentRecord> = {
            let decided = self.decided.read().unwrap_or_else(|e| e.into_inner());
            records
                .into_iter()
                .filter(|r| r.status == DeploymentStatus::Pending && !decided.contains(&r.id))
                .collect()
        };

        let mut pending = self.pending.write().unwrap_or_else(|e| e.into_inner());
        *pending = fresh.clone();
        info!("{} deployment(s) awaiting approval", fresh.len());
        Ok(fresh)
    }

    /// Last fetched view, minus anything decided since
    pub fn pending(&self) -> Vec<DeploymentRecord> {
        let pending = self.pending.read().unwrap_or_else(|e| e.into_inner());
        pending.clone()
    }

    pub fn is_decided(&self, deploy_id: &str) -> bool {
        let decided = self.decided.read().unwrap_or_else(|e| e.into_inner());
        decided.contains(deploy_id)
    }

    /// Approve or reject a deployment.
    ///
    /// A second decision on an id this queue already decided, or is deciding,
    /// is a no-op and is not sent again: the pipeline makes no idempotence
    /// promise. The id is reserved before the call and released if it fails.
    pub async fn decide(&self, deploy_id: &str, approved: bool) -> Result<(), ApprovalActionError> {
        let reserved = {
            let mut decided = self.decided.write().unwrap_or_else(|e| e.into_inner());
            decided.insert(deploy_id.to_string())
        };
        if !reserved {
            warn!("Deployment {} already decided, ignoring", deploy_id);
            return Ok(());
        }

        let action = if approved { "approve" } else { "reject" };
        if let Err(e) = self.pipeline.decide_approval(deploy_id, approved).await {
            error!("Failed to {} deployment {}: {}", action, deploy_id, e);
            let mut decided = self.decided.write().unwrap_or_else(|e| e.into_inner());
            decided.remove(deploy_id);
            return Err(ApprovalActionError {
                deploy_id: deploy_id.to_string(),
                source: e,
            });
        }

        let mut pending = self.pending.write().unwrap_or_else(|e| e.into_inner());
        pending.retain(|r| r.id != deploy_id);

        info!("Deployment {} {}d", deploy_id, action);
        Ok(())
    }
}
