//! Service catalog API client

use openapi_client::models::{ServiceEnvKeysResponse, ServiceListResponse, SuggestTagsResponse};
use tracing::debug;

use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::models::deployment::Service;

impl HttpClient {
    /// List deployable services
    pub async fn get_services(&self) -> Result<Vec<Service>, ConsoleError> {
        let response: ServiceListResponse = self.get(&["services"]).await?;
        Ok(response
            .services
            .into_iter()
            .map(|s| Service {
                name: s.name,
                envs: s.envs,
            })
            .collect())
    }

    /// Get the recognized environment-variable keys of a service
    pub async fn get_service_env_keys(&self, service: &str) -> Result<Vec<String>, ConsoleError> {
        let response: ServiceEnvKeysResponse = self.get(&["service-env-keys", service]).await?;
        Ok(response.keys)
    }

    /// Get tag suggestions for a service image
    pub async fn get_suggested_tags(
        &self,
        registry: &str,
        service: &str,
    ) -> Result<Vec<String>, ConsoleError> {
        let response: SuggestTagsResponse =
            self.get(&["suggest-tags", registry, service]).await?;
        if let Some(err) = response.error {
            debug!("Registry returned no tags for {}/{}: {}", registry, service, err);
        }
        Ok(response.tags.unwrap_or_default())
    }
}
