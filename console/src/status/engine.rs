//! Status reconciliation engine

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::models::deployment::{DeploymentStatus, SubmissionReceipt};
use crate::pipeline::{Pipeline, PushChannel};
use crate::status::tracker::{ChannelState, TrackerShared};
use crate::workers::{poller, relay};

/// Engine options
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub relay: relay::Options,
    pub poller: poller::Options,
}

struct TrackerEntry {
    shared: Arc<TrackerShared>,
    observers: usize,
    shutdown_tx: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl TrackerEntry {
    fn stop(self) {
        let _ = self.shutdown_tx.send(());
        for handle in self.handles {
            handle.abort();
        }
    }
}

type Trackers = Arc<Mutex<HashMap<String, TrackerEntry>>>;

/// Tracks deployments by tracking id, one tracker per id however many
/// observers are attached
pub struct StatusEngine {
    pipeline: Arc<dyn Pipeline>,
    push: Option<Arc<dyn PushChannel>>,
    options: EngineOptions,
    trackers: Trackers,
}

impl StatusEngine {
    /// Engine with a push channel and poll fallback
    pub fn new(
        pipeline: Arc<dyn Pipeline>,
        push: Arc<dyn PushChannel>,
        options: EngineOptions,
    ) -> Self {
        Self {
            pipeline,
            push: Some(push),
            options,
            trackers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Engine that only polls
    pub fn poll_only(pipeline: Arc<dyn Pipeline>, options: EngineOptions) -> Self {
        Self {
            pipeline,
            push: None,
            options,
            trackers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Observe a freshly submitted deployment, starting from `pending`
    pub fn subscribe(&self, receipt: &SubmissionReceipt) -> StatusSubscription {
        self.subscribe_from(receipt, DeploymentStatus::Pending)
    }

    /// Observe a deployment whose last known status is `initial`.
    ///
    /// Joins the existing tracker if the id is already tracked. Must be
    /// called from within a tokio runtime.
    pub fn subscribe_from(
        &self,
        receipt: &SubmissionReceipt,
        initial: DeploymentStatus,
    ) -> StatusSubscription {
        let mut trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());

        let entry = trackers
            .entry(receipt.tracking_id.clone())
            .or_insert_with(|| self.start_tracker(receipt, initial));
        entry.observers += 1;
        debug!(
            "Observer attached to {} ({} total)",
            receipt.tracking_id, entry.observers
        );

        StatusSubscription {
            tracking_id: receipt.tracking_id.clone(),
            status_rx: entry.shared.subscribe_status(),
            channel_rx: entry.shared.subscribe_channel(),
            trackers: self.trackers.clone(),
        }
    }

    fn start_tracker(&self, receipt: &SubmissionReceipt, initial: DeploymentStatus) -> TrackerEntry {
        info!(
            "Tracking deployment {} (pull request {})",
            receipt.tracking_id, receipt.pr_reference
        );

        let shared = Arc::new(TrackerShared::new(receipt.clone(), initial));
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut handles = Vec::with_capacity(2);

        if let Some(push) = &self.push {
            let options = self.options.relay.clone();
            let pipeline = self.pipeline.clone();
            let push = push.clone();
            let shared = shared.clone();
            let mut shutdown_rx = shutdown_tx.subscribe();
            handles.push(tokio::spawn(async move {
                relay::run(
                    &options,
                    pipeline,
                    push,
                    shared,
                    tokio::time::sleep,
                    Box::pin(async move {
                        let _ = shutdown_rx.recv().await;
                    }),
                )
                .await;
            }));
        }

        let options = self.options.poller.clone();
        let pipeline = self.pipeline.clone();
        let poll_shared = shared.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            poller::run(
                &options,
                pipeline,
                poll_shared,
                tokio::time::sleep,
                Box::pin(async move {
                    let _ = shutdown_rx.recv().await;
                }),
            )
            .await;
        }));

        TrackerEntry {
            shared,
            observers: 0,
            shutdown_tx,
            handles,
        }
    }

    /// Current status of a tracked deployment
    pub fn status(&self, tracking_id: &str) -> Option<DeploymentStatus> {
        let trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        trackers.get(tracking_id).map(|entry| entry.shared.status())
    }

    pub fn is_tracking(&self, tracking_id: &str) -> bool {
        let trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        trackers.contains_key(tracking_id)
    }

    /// Number of tracked deployments
    pub fn tracked_count(&self) -> usize {
        let trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        trackers.len()
    }

    /// Stop every tracker regardless of attached observers
    pub fn shutdown(&self) {
        let mut trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        let count = trackers.len();
        for (_, entry) in trackers.drain() {
            entry.stop();
        }
        info!("Status engine stopped {} tracker(s)", count);
    }
}

impl Drop for StatusEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// An observer's handle on one tracked deployment.
///
/// Dropping the last subscription of a tracking id closes its channels and
/// releases its state.
pub struct StatusSubscription {
    tracking_id: String,
    status_rx: watch::Receiver<DeploymentStatus>,
    channel_rx: watch::Receiver<ChannelState>,
    trackers: Trackers,
}

impl StatusSubscription {
    pub fn tracking_id(&self) -> &str {
        &self.tracking_id
    }

    /// Authoritative status
    pub fn status(&self) -> DeploymentStatus {
        *self.status_rx.borrow()
    }

    /// Push channel state
    pub fn channel_state(&self) -> ChannelState {
        *self.channel_rx.borrow()
    }

    /// Wait for the next status change.
    ///
    /// `None` once tracking stopped, or once a final status has been seen.
    pub async fn changed(&mut self) -> Option<DeploymentStatus> {
        if settled(&self.status_rx) {
            return None;
        }
        self.status_rx.changed().await.ok()?;
        Some(*self.status_rx.borrow_and_update())
    }

    /// Wait until the status satisfies `predicate`
    pub async fn wait_for<P>(&mut self, mut predicate: P) -> Option<DeploymentStatus>
    where
        P: FnMut(DeploymentStatus) -> bool,
    {
        let status = self.status_rx.wait_for(|s| predicate(*s)).await.ok()?;
        Some(*status)
    }

    /// Wait until the channel reaches `state`
    pub async fn wait_for_channel(&mut self, state: ChannelState) -> Option<ChannelState> {
        let current = self.channel_rx.wait_for(|s| *s == state).await.ok()?;
        Some(*current)
    }

    /// Stream of status changes after this call.
    ///
    /// Ends after yielding a final status, or when tracking stops.
    pub fn updates(&self) -> BoxStream<'static, DeploymentStatus> {
        let rx = self.status_rx.clone();
        let start = (!settled(&rx)).then_some(rx);
        stream::unfold(start, |rx| async move {
            let mut rx = rx?;
            rx.changed().await.ok()?;
            let status = *rx.borrow_and_update();
            let next = (!status.is_final()).then_some(rx);
            Some((status, next))
        })
        .boxed()
    }
}

/// Final status already seen: the workers have stopped and nothing follows
fn settled(rx: &watch::Receiver<DeploymentStatus>) -> bool {
    let pending = rx.has_changed().unwrap_or(false);
    !pending && rx.borrow().is_final()
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        let mut trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        let detach = match trackers.get_mut(&self.tracking_id) {
            Some(entry) => {
                entry.observers = entry.observers.saturating_sub(1);
                entry.observers == 0
            }
            None => false,
        };

        if detach {
            if let Some(entry) = trackers.remove(&self.tracking_id) {
                info!("Last observer detached, releasing {}", self.tracking_id);
                entry.stop();
            }
        }
    }
}
