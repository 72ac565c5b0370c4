//! API models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deployable service entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    #[serde(default)]
    pub envs: Vec<String>,
}

/// Service catalog response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceListResponse {
    pub services: Vec<ServiceInfo>,
}

/// Recognized environment-variable keys of a service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEnvKeysResponse {
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Tag suggestions from the image registry.
///
/// The backend answers with `{"error": ..}` instead of `tags` when the
/// registry is unreachable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestTagsResponse {
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Deployment request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub service: String,
    pub tag: String,
    pub env: String,
    pub namespace_type: String,
    pub vars: BTreeMap<String, String>,
    pub secrets: Vec<String>,
}

/// Deployment request response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    pub pr_url: String,
    pub deploy_id: String,
}

/// Pull-request status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrStatusResponse {
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub status: Option<String>,
}

/// Deployment status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployStatusResponse {
    #[serde(default)]
    pub status: Option<String>,
}

/// Message pushed on the status WebSocket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPushMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_status: Option<String>,
}

/// Deployment record as stored by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecordInfo {
    pub id: String,
    pub service: String,
    pub env: String,
    pub tag: String,
    pub pr_url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub approved_by: Option<String>,
}

/// Deployment list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentListResponse {
    pub deployments: Vec<DeploymentRecordInfo>,
}

/// Approval decision body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub deploy_id: String,
    pub approved: bool,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
