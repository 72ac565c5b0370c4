//! In-memory collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use tokio::sync::mpsc;

use deploy_console::errors::{ChannelError, ConsoleError};
use deploy_console::models::deployment::{
    DeploymentRecord, DeploymentRequest, DeploymentStatus, PrStatus, Service, SubmissionReceipt,
};
use deploy_console::pipeline::{Pipeline, PushChannel, PushStream};
use deploy_console::status::engine::EngineOptions;
use deploy_console::utils::BackoffOptions;
use deploy_console::workers::{poller, relay};
use openapi_client::models::StatusPushMessage;

pub type PushSender = mpsc::UnboundedSender<Result<StatusPushMessage, ChannelError>>;

/// Scriptable pipeline backend
#[derive(Default)]
pub struct FakePipeline {
    pub services: Vec<Service>,
    /// Services without an entry fail schema resolution
    pub schemas: HashMap<String, Vec<String>>,
    pub schema_delays: HashMap<String, Duration>,
    pub tags: Vec<String>,
    pub fail_submissions: AtomicUsize,
    pub submissions: Mutex<Vec<DeploymentRequest>>,
    pub pr_status: Mutex<Option<PrStatus>>,
    pub deploy_status: Mutex<Option<String>>,
    pub polls: AtomicUsize,
    pub records: Mutex<Vec<DeploymentRecord>>,
    pub decisions: Mutex<Vec<(String, bool)>>,
    pub fail_decisions: AtomicBool,
    pub decision_delay: Mutex<Option<Duration>>,
}

impl FakePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, name: &str, keys: &[&str]) -> Self {
        self.services.push(Service {
            name: name.to_string(),
            envs: vec!["dev".to_string(), "stag".to_string(), "prod".to_string()],
        });
        self.schemas.insert(
            name.to_string(),
            keys.iter().map(|k| k.to_string()).collect(),
        );
        self
    }

    pub fn set_deploy_status(&self, status: &str) {
        *self.deploy_status.lock().unwrap() = Some(status.to_string());
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn decision_count(&self) -> usize {
        self.decisions.lock().unwrap().len()
    }
}

#[async_trait]
impl Pipeline for FakePipeline {
    async fn list_services(&self) -> Result<Vec<Service>, ConsoleError> {
        Ok(self.services.clone())
    }

    async fn get_variable_schema(&self, service: &str) -> Result<Vec<String>, ConsoleError> {
        if let Some(delay) = self.schema_delays.get(service) {
            tokio::time::sleep(*delay).await;
        }
        self.schemas
            .get(service)
            .cloned()
            .ok_or_else(|| ConsoleError::NotFound(service.to_string()))
    }

    async fn suggest_tags(
        &self,
        _registry: &str,
        _service: &str,
    ) -> Result<Vec<String>, ConsoleError> {
        Ok(self.tags.clone())
    }

    async fn submit_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<SubmissionReceipt, ConsoleError> {
        self.submissions.lock().unwrap().push(request.clone());
        let remaining_failures = self.fail_submissions.load(Ordering::SeqCst);
        if remaining_failures > 0 {
            self.fail_submissions
                .store(remaining_failures - 1, Ordering::SeqCst);
            return Err(ConsoleError::BackendError {
                status: 503,
                body: "pipeline unavailable".to_string(),
            });
        }
        Ok(SubmissionReceipt {
            pr_reference: "https://git/pr/42".to_string(),
            tracking_id: "abc".to_string(),
        })
    }

    async fn poll_pr_status(&self, _pr_id: &str) -> Result<PrStatus, ConsoleError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.pr_status.lock().unwrap().clone() {
            Some(status) => Ok(status),
            None => Err(ConsoleError::NotFound("pr".to_string())),
        }
    }

    async fn poll_deploy_status(&self, _tracking_id: &str) -> Result<Option<String>, ConsoleError> {
        Ok(self.deploy_status.lock().unwrap().clone())
    }

    async fn list_pending_approvals(&self) -> Result<Vec<DeploymentRecord>, ConsoleError> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn decide_approval(&self, tracking_id: &str, approved: bool) -> Result<(), ConsoleError> {
        let delay = *self.decision_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_decisions.load(Ordering::SeqCst) {
            return Err(ConsoleError::BackendError {
                status: 500,
                body: "merge failed".to_string(),
            });
        }
        self.decisions
            .lock()
            .unwrap()
            .push((tracking_id.to_string(), approved));
        Ok(())
    }
}

/// Push channel whose connections are handed out in order.
///
/// With no queued connection the handshake is refused; with `hang` set it
/// never completes.
#[derive(Default)]
pub struct FakePush {
    queue: Mutex<VecDeque<mpsc::UnboundedReceiver<Result<StatusPushMessage, ChannelError>>>>,
    pub opens: AtomicUsize,
    pub hang: AtomicBool,
}

impl FakePush {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one connection and return its server side
    pub fn connection(&self) -> PushSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queue.lock().unwrap().push_back(rx);
        tx
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushChannel for FakePush {
    async fn open(&self, _tracking_id: &str) -> Result<PushStream, ChannelError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let rx = self.queue.lock().unwrap().pop_front();
        match rx {
            Some(rx) => Ok(futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|msg| (msg, rx))
            })
            .boxed()),
            None => Err(ChannelError::Handshake("connection refused".to_string())),
        }
    }
}

pub fn push_message(deploy_status: &str) -> StatusPushMessage {
    StatusPushMessage {
        deploy_status: Some(deploy_status.to_string()),
        ..Default::default()
    }
}

pub fn receipt() -> SubmissionReceipt {
    SubmissionReceipt {
        pr_reference: "https://git/pr/42".to_string(),
        tracking_id: "abc".to_string(),
    }
}

pub fn record(id: &str, status: DeploymentStatus) -> DeploymentRecord {
    DeploymentRecord {
        id: id.to_string(),
        service: "retail-api".to_string(),
        env: "prod".to_string(),
        tag: "v1.2.0".to_string(),
        pr_reference: format!("https://git/pr/{}", id),
        status,
        created_at: Utc::now(),
        approved_by: None,
    }
}

/// Millisecond-scale timings
pub fn fast_options() -> EngineOptions {
    EngineOptions {
        relay: relay::Options {
            handshake_timeout: Duration::from_millis(100),
            reconnect: BackoffOptions {
                base_delay: Duration::from_millis(20),
                max_delay: Duration::from_millis(40),
                multiplier: 2.0,
            },
        },
        poller: poller::Options {
            interval: Duration::from_millis(20),
            poll_while_connected: true,
        },
    }
}

/// Poll `condition` until it holds or a second passes
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
