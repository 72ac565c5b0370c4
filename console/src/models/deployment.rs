//! Deployment models

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use openapi_client::models::{DeployRequest, DeploymentRecordInfo};

/// Service name accepted without a catalog entry
pub const CUSTOM_SERVICE: &str = "custom";

/// Target environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    Dev,
    Stag,
    Prod,
}

impl Env {
    pub fn as_str(&self) -> &'static str {
        match self {
            Env::Dev => "dev",
            Env::Stag => "stag",
            Env::Prod => "prod",
        }
    }
}

impl FromStr for Env {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" => Ok(Env::Dev),
            "stag" | "staging" => Ok(Env::Stag),
            "prod" | "production" => Ok(Env::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespace the service is deployed into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceType {
    #[default]
    Internal,
    External,
}

impl NamespaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamespaceType::Internal => "internal",
            NamespaceType::External => "external",
        }
    }
}

impl FromStr for NamespaceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "internal" => Ok(NamespaceType::Internal),
            "external" => Ok(NamespaceType::External),
            _ => Err(format!("Invalid namespace type: {}", s)),
        }
    }
}

/// A finished, validated deployment request.
///
/// Only the wizard builds these; the fields are read-only afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub(crate) service: String,
    pub(crate) tag: String,
    pub(crate) env: Env,
    pub(crate) namespace_type: NamespaceType,
    pub(crate) vars: BTreeMap<String, String>,
    pub(crate) secret_keys: BTreeSet<String>,
}

impl DeploymentRequest {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn env(&self) -> Env {
        self.env
    }

    pub fn namespace_type(&self) -> NamespaceType {
        self.namespace_type
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn secret_keys(&self) -> &BTreeSet<String> {
        &self.secret_keys
    }

    pub fn is_secret(&self, key: &str) -> bool {
        self.secret_keys.contains(key)
    }

    /// Value as it may be shown or logged
    pub fn display_value(&self, key: &str) -> Option<&str> {
        let value = self.vars.get(key)?;
        if self.is_secret(key) {
            Some(MASK)
        } else {
            Some(value.as_str())
        }
    }

    /// Wire body for the pipeline trigger
    pub fn to_wire(&self) -> DeployRequest {
        DeployRequest {
            service: self.service.clone(),
            tag: self.tag.clone(),
            env: self.env.as_str().to_string(),
            namespace_type: self.namespace_type.as_str().to_string(),
            vars: self.vars.clone(),
            secrets: self.secret_keys.iter().cloned().collect(),
        }
    }
}

const MASK: &str = "********";

impl fmt::Debug for DeploymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked: BTreeMap<&str, &str> = self
            .vars
            .keys()
            .filter_map(|k| self.display_value(k).map(|v| (k.as_str(), v)))
            .collect();
        f.debug_struct("DeploymentRequest")
            .field("service", &self.service)
            .field("tag", &self.tag)
            .field("env", &self.env)
            .field("namespace_type", &self.namespace_type)
            .field("vars", &masked)
            .field("secret_keys", &self.secret_keys)
            .finish()
    }
}

/// What the pipeline hands back for an accepted request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub pr_reference: String,
    pub tracking_id: String,
}

impl SubmissionReceipt {
    /// Pull-request id used by the PR status endpoint
    pub fn pr_id(&self) -> &str {
        self.pr_reference
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.pr_reference)
    }
}

/// Deployment lifecycle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Pending,
    Approved,
    Merged,
    Synced,
    Rejected,
    Error,
}

impl DeploymentStatus {
    /// Position in the happy path; `None` for terminal failures
    pub fn rank(&self) -> Option<u8> {
        match self {
            DeploymentStatus::Pending => Some(0),
            DeploymentStatus::Approved => Some(1),
            DeploymentStatus::Merged => Some(2),
            DeploymentStatus::Synced => Some(3),
            DeploymentStatus::Rejected | DeploymentStatus::Error => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Rejected | DeploymentStatus::Error)
    }

    /// Nothing further can happen to the deployment
    pub fn is_final(&self) -> bool {
        self.is_terminal() || *self == DeploymentStatus::Synced
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "pending",
            DeploymentStatus::Approved => "approved",
            DeploymentStatus::Merged => "merged",
            DeploymentStatus::Synced => "synced",
            DeploymentStatus::Rejected => "rejected",
            DeploymentStatus::Error => "error",
        }
    }

    /// Parse a status string reported by the pipeline
    pub fn parse_reported(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "open" => Some(DeploymentStatus::Pending),
            "approved" => Some(DeploymentStatus::Approved),
            "merged" => Some(DeploymentStatus::Merged),
            "synced" | "deployed" | "healthy" => Some(DeploymentStatus::Synced),
            "rejected" | "closed" | "declined" => Some(DeploymentStatus::Rejected),
            "error" | "failed" => Some(DeploymentStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local mirror of a pipeline deployment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: String,
    pub service: String,
    pub env: String,
    pub tag: String,
    pub pr_reference: String,
    pub status: DeploymentStatus,
    pub created_at: DateTime<Utc>,
    pub approved_by: Option<String>,
}

impl DeploymentRecord {
    /// Convert a wire record. Unrecognized statuses map to `Error`.
    pub fn from_wire(info: DeploymentRecordInfo) -> Self {
        let status =
            DeploymentStatus::parse_reported(&info.status).unwrap_or(DeploymentStatus::Error);
        Self {
            id: info.id,
            service: info.service,
            env: info.env,
            tag: info.tag,
            pr_reference: info.pr_url,
            status,
            created_at: info.created_at,
            approved_by: info.approved_by,
        }
    }
}

/// Deployable service with the environments it may go to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub envs: Vec<String>,
}

/// Normalized variable schema of a service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSchema {
    pub keys: Vec<String>,
    pub suggested_tags: Vec<String>,
}

impl VariableSchema {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Pull-request status as polled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrStatus {
    pub merged: bool,
    pub status: Option<String>,
}
