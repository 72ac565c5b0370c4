//! Per-deployment tracker state shared by the push and poll workers

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::deployment::{DeploymentStatus, SubmissionReceipt};
use crate::pipeline::Pipeline;
use crate::status::reconcile::{statuses_from_poll, Reconciler, StatusSource};

/// Push channel connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// Reconciled state of one tracked deployment.
///
/// Only [`TrackerShared::observe`] mutates the status.
pub struct TrackerShared {
    receipt: SubmissionReceipt,
    reconciler: Mutex<Reconciler>,
    status_tx: watch::Sender<DeploymentStatus>,
    channel_tx: watch::Sender<ChannelState>,
}

impl TrackerShared {
    pub fn new(receipt: SubmissionReceipt, initial: DeploymentStatus) -> Self {
        let (status_tx, _) = watch::channel(initial);
        let (channel_tx, _) = watch::channel(ChannelState::Disconnected);
        Self {
            receipt,
            reconciler: Mutex::new(Reconciler::new(initial)),
            status_tx,
            channel_tx,
        }
    }

    pub fn receipt(&self) -> &SubmissionReceipt {
        &self.receipt
    }

    pub fn tracking_id(&self) -> &str {
        &self.receipt.tracking_id
    }

    pub fn status(&self) -> DeploymentStatus {
        *self.status_tx.borrow()
    }

    pub fn is_final(&self) -> bool {
        self.status().is_final()
    }

    pub fn channel_state(&self) -> ChannelState {
        *self.channel_tx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<DeploymentStatus> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_channel(&self) -> watch::Receiver<ChannelState> {
        self.channel_tx.subscribe()
    }

    pub fn set_channel_state(&self, state: ChannelState) {
        self.channel_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!("Channel {}: {:?} -> {:?}", self.tracking_id(), current, state);
            *current = state;
            true
        });
    }

    /// Fold observed statuses; observers are notified only on a change.
    ///
    /// The reconciler lock is held until the new status is published so
    /// concurrent observations publish in reconciliation order.
    pub fn observe(
        &self,
        statuses: Vec<DeploymentStatus>,
        source: StatusSource,
    ) -> Option<DeploymentStatus> {
        let mut reconciler = self.reconciler.lock().unwrap_or_else(|e| e.into_inner());
        let changed = reconciler.apply_all(statuses);

        if let Some(status) = changed {
            info!(
                "Deployment {} is now {} (via {:?})",
                self.tracking_id(),
                status,
                source
            );
            self.status_tx.send_replace(status);
        }
        changed
    }
}

/// Query both read endpoints once and fold the result
pub async fn poll_once(pipeline: &dyn Pipeline, shared: &TrackerShared) -> Option<DeploymentStatus> {
    let receipt = shared.receipt();
    let pr_id = receipt.pr_id();

    let pr_poll = async {
        if pr_id.is_empty() {
            return None;
        }
        match pipeline.poll_pr_status(pr_id).await {
            Ok(pr) => Some(pr),
            Err(e) => {
                warn!("PR status poll for {} failed: {}", pr_id, e);
                None
            }
        }
    };
    let deploy_poll = async {
        match pipeline.poll_deploy_status(&receipt.tracking_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    "Deployment status poll for {} failed: {}",
                    receipt.tracking_id, e
                );
                None
            }
        }
    };

    let (pr, deploy_status) = tokio::join!(pr_poll, deploy_poll);
    shared.observe(
        statuses_from_poll(pr.as_ref(), deploy_status.as_deref()),
        StatusSource::Poll,
    )
}
