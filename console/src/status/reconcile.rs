//! Monotonic reconciliation of observed deployment statuses

use openapi_client::models::StatusPushMessage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::deployment::{DeploymentStatus, PrStatus};

/// Where an observation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusSource {
    Push,
    Poll,
}

/// Result of folding one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The authoritative status moved
    Advanced(DeploymentStatus),

    /// Same stage as held
    Duplicate,

    /// Earlier than held, or after a final status
    Stale,
}

/// Authoritative status of one deployment
#[derive(Debug, Clone)]
pub struct Reconciler {
    status: DeploymentStatus,
}

impl Reconciler {
    pub fn new(initial: DeploymentStatus) -> Self {
        Self { status: initial }
    }

    pub fn status(&self) -> DeploymentStatus {
        self.status
    }

    /// Fold one observed status.
    ///
    /// Happy-path stages only move forward. `rejected` and `error` are
    /// accepted from any non-terminal status; holding one terminal status
    /// and observing the other resolves to `error`.
    pub fn apply(&mut self, observed: DeploymentStatus) -> Outcome {
        use DeploymentStatus::{Error, Rejected};

        let next = match (self.status, observed) {
            (held, seen) if held == seen => return Outcome::Duplicate,
            (Rejected, Error) | (Error, Rejected) => Error,
            (held, _) if held.is_terminal() => return Outcome::Stale,
            (_, seen) if seen.is_terminal() => seen,
            (held, seen) => match (held.rank(), seen.rank()) {
                (Some(h), Some(s)) if s > h => seen,
                _ => return Outcome::Stale,
            },
        };

        if next == self.status {
            return Outcome::Duplicate;
        }
        self.status = next;
        Outcome::Advanced(next)
    }

    /// Fold a sequence of observations; returns the final change, if any
    pub fn apply_all<I>(&mut self, observed: I) -> Option<DeploymentStatus>
    where
        I: IntoIterator<Item = DeploymentStatus>,
    {
        let mut changed = None;
        for status in observed {
            if let Outcome::Advanced(next) = self.apply(status) {
                changed = Some(next);
            }
        }
        changed
    }
}

/// Statuses carried by a push message, in folding order
pub fn statuses_from_push(msg: &StatusPushMessage) -> Vec<DeploymentStatus> {
    if let Some(err) = &msg.error {
        debug!("Push message reports error: {}", err);
        return vec![DeploymentStatus::Error];
    }

    let mut statuses = Vec::with_capacity(3);
    if msg.merged == Some(true) {
        statuses.push(DeploymentStatus::Merged);
    }
    statuses.extend(parse_optional(msg.status.as_deref()));
    statuses.extend(parse_optional(msg.deploy_status.as_deref()));
    statuses
}

/// Statuses carried by one poll cycle, in folding order
pub fn statuses_from_poll(
    pr: Option<&PrStatus>,
    deploy_status: Option<&str>,
) -> Vec<DeploymentStatus> {
    let mut statuses = Vec::with_capacity(3);
    if let Some(pr) = pr {
        if pr.merged {
            statuses.push(DeploymentStatus::Merged);
        }
        statuses.extend(parse_optional(pr.status.as_deref()));
    }
    statuses.extend(parse_optional(deploy_status));
    statuses
}

fn parse_optional(raw: Option<&str>) -> Option<DeploymentStatus> {
    let raw = raw?;
    let parsed = DeploymentStatus::parse_reported(raw);
    if parsed.is_none() {
        debug!("Ignoring unrecognized status: {}", raw);
    }
    parsed
}
