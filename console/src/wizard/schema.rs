//! Variable schema resolution

use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::SchemaFetchError;
use crate::models::deployment::VariableSchema;
use crate::pipeline::Pipeline;

/// Registry queried for tag suggestions when none is configured
pub const DEFAULT_REGISTRY: &str = "nexah";

/// Resolves the variable schema of a service against the pipeline
pub struct SchemaResolver {
    pipeline: Arc<dyn Pipeline>,
    registry: String,
}

impl SchemaResolver {
    pub fn new(pipeline: Arc<dyn Pipeline>, registry: impl Into<String>) -> Self {
        Self {
            pipeline,
            registry: registry.into(),
        }
    }

    /// Resolve keys and tag suggestions.
    ///
    /// Never fails: an unreachable or rejecting backend yields an empty
    /// schema so the wizard stays usable for ad-hoc services.
    pub async fn resolve(&self, service: &str) -> VariableSchema {
        if service.trim().is_empty() {
            warn!("Schema requested for an empty service name");
            return VariableSchema::empty();
        }

        let (keys, tags) = tokio::join!(self.fetch_keys(service), self.fetch_tags(service));

        let keys = match keys {
            Ok(keys) => keys,
            Err(e) => {
                warn!("{}; continuing with an empty schema", e);
                return VariableSchema::empty();
            }
        };

        VariableSchema {
            keys,
            suggested_tags: tags,
        }
    }

    async fn fetch_keys(&self, service: &str) -> Result<Vec<String>, SchemaFetchError> {
        let keys = self
            .pipeline
            .get_variable_schema(service)
            .await
            .map_err(|source| SchemaFetchError {
                service: service.to_string(),
                source,
            })?;

        // Normalize: trimmed, non-empty, first occurrence wins
        let mut normalized: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.trim();
            if !key.is_empty() && !normalized.iter().any(|k| k == key) {
                normalized.push(key.to_string());
            }
        }
        debug!("Resolved {} variable keys for {}", normalized.len(), service);
        Ok(normalized)
    }

    async fn fetch_tags(&self, service: &str) -> Vec<String> {
        match self.pipeline.suggest_tags(&self.registry, service).await {
            Ok(tags) => tags,
            Err(e) => {
                debug!("No tag suggestions for {}: {}", service, e);
                Vec::new()
            }
        }
    }
}
