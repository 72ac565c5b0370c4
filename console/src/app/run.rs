//! Console commands

use std::future::Future;

use tracing::{info, warn};

use crate::app::state::AppState;
use crate::errors::{ConsoleError, WizardError};
use crate::models::deployment::{
    DeploymentRecord, DeploymentStatus, Env, NamespaceType, Service, SubmissionReceipt,
    VariableSchema,
};
use crate::wizard::fsm::Wizard;

/// Inputs of a non-interactive wizard run
#[derive(Debug, Clone)]
pub struct DeployArgs {
    pub service: String,
    pub tag: String,
    pub env: Env,
    pub namespace_type: NamespaceType,
    /// Values for schema keys; unknown keys are added as custom keys
    pub vars: Vec<(String, String)>,
    /// Keys added outside the schema
    pub custom_vars: Vec<(String, String)>,
    pub secrets: Vec<String>,
}

/// List deployable services
pub async fn list_services(state: &AppState) -> Result<Vec<Service>, ConsoleError> {
    state.pipeline.list_services().await
}

/// Resolve the variable schema of a service
pub async fn show_schema(state: &AppState, service: &str) -> VariableSchema {
    state.resolver.resolve(service).await
}

/// Drive the wizard from `Configure` to `Submitted`
pub async fn deploy(state: &AppState, args: &DeployArgs) -> Result<SubmissionReceipt, ConsoleError> {
    let mut wizard = match state.pipeline.list_services().await {
        Ok(services) => Wizard::with_catalog(services.into_iter().map(|s| s.name)),
        Err(e) => {
            warn!("Service catalog unavailable, accepting any service: {}", e);
            Wizard::new()
        }
    };

    fill_wizard(state, &mut wizard, args).await.map_err(validation)?;

    let receipt = wizard.submit(&state.gateway).await.map_err(|e| match e {
        WizardError::Submission(e) => e.0,
        other => validation(other),
    })?;
    Ok(receipt)
}

async fn fill_wizard(
    state: &AppState,
    wizard: &mut Wizard,
    args: &DeployArgs,
) -> Result<(), WizardError> {
    wizard.choose_service(&state.resolver, &args.service).await?;
    wizard.set_tag(&args.tag)?;
    wizard.set_env(args.env)?;
    wizard.set_namespace_type(args.namespace_type)?;
    wizard.next()?;

    for (key, value) in &args.vars {
        match wizard.set_var(key, value) {
            Err(WizardError::UnknownKey(_)) => wizard.add_custom_var(key, value)?,
            other => other?,
        }
    }
    for (key, value) in &args.custom_vars {
        wizard.add_custom_var(key, value)?;
    }
    for key in &args.secrets {
        if !wizard.secret_keys().contains(key) {
            wizard.toggle_secret(key)?;
        }
    }

    wizard.next()
}

fn validation(err: WizardError) -> ConsoleError {
    ConsoleError::ValidationError(err.to_string())
}

/// Follow a deployment until it reaches a final status or `shutdown_signal`
/// fires; returns the last known status
pub async fn watch<C>(
    state: &AppState,
    receipt: &SubmissionReceipt,
    mut on_change: C,
    shutdown_signal: impl Future<Output = ()>,
) -> DeploymentStatus
where
    C: FnMut(DeploymentStatus),
{
    let mut subscription = state.engine.subscribe(receipt);
    on_change(subscription.status());
    tokio::pin!(shutdown_signal);

    loop {
        let status = subscription.status();
        if status.is_final() {
            info!("Deployment {} finished: {}", receipt.tracking_id, status);
            return status;
        }

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Stopped watching {}", receipt.tracking_id);
                return subscription.status();
            }
            changed = subscription.changed() => match changed {
                Some(status) => on_change(status),
                None => return subscription.status(),
            }
        }
    }
}

/// Deployments awaiting approval
pub async fn list_approvals(state: &AppState) -> Result<Vec<DeploymentRecord>, ConsoleError> {
    state.approvals.list_pending().await
}

/// Approve or reject one deployment
pub async fn decide(state: &AppState, deploy_id: &str, approved: bool) -> Result<(), ConsoleError> {
    state
        .approvals
        .decide(deploy_id, approved)
        .await
        .map_err(|e| e.source)
}

/// Parse `K=V,K2=V2`
pub fn parse_pairs(raw: &str) -> Result<Vec<(String, String)>, ConsoleError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(ConsoleError::ValidationError(format!(
                "Expected KEY=VALUE, got '{}'",
                item
            ))),
        })
        .collect()
}

/// Parse `K,K2`
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
