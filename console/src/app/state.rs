//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::approvals::queue::ApprovalQueue;
use crate::authn::session::SessionAuth;
use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::pipeline::push::WsPushChannel;
use crate::pipeline::Pipeline;
use crate::status::engine::StatusEngine;
use crate::submission::gateway::SubmissionGateway;
use crate::wizard::schema::SchemaResolver;

/// Main application state
pub struct AppState {
    /// Session the collaborators authenticate with
    pub auth: Arc<SessionAuth>,

    /// Pipeline backend
    pub pipeline: Arc<dyn Pipeline>,

    /// Variable schema resolver
    pub resolver: SchemaResolver,

    /// Submission gateway
    pub gateway: SubmissionGateway,

    /// Status reconciliation engine
    pub engine: StatusEngine,

    /// Approval queue
    pub approvals: ApprovalQueue,
}

impl AppState {
    /// Initialize application state
    pub fn init(options: &AppOptions, auth: Arc<SessionAuth>) -> Result<Self, ConsoleError> {
        info!("Initializing application state...");

        let http_client = HttpClient::with_timeout(
            &options.backend_base_url,
            auth.clone(),
            options.request_timeout,
        )?;
        let pipeline: Arc<dyn Pipeline> = Arc::new(http_client);
        let push = Arc::new(WsPushChannel::new(&options.push_base_url, auth.clone())?);

        Ok(Self::with_collaborators(options, auth, pipeline, push))
    }

    /// Assemble state around given collaborators
    pub fn with_collaborators(
        options: &AppOptions,
        auth: Arc<SessionAuth>,
        pipeline: Arc<dyn Pipeline>,
        push: Arc<dyn crate::pipeline::PushChannel>,
    ) -> Self {
        Self {
            auth,
            resolver: SchemaResolver::new(pipeline.clone(), options.registry.clone()),
            gateway: SubmissionGateway::new(pipeline.clone()),
            engine: StatusEngine::new(pipeline.clone(), push, options.engine.clone()),
            approvals: ApprovalQueue::new(pipeline.clone()),
            pipeline,
        }
    }

    /// Shutdown application state
    pub fn shutdown(&self) {
        info!("Shutting down application state...");
        self.engine.shutdown();
    }
}
