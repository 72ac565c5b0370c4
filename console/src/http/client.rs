//! HTTP client implementation

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::authn::session::SessionAuth;
use crate::errors::ConsoleError;

/// Header correlating a request with backend logs
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// HTTP client for the pipeline backend
pub struct HttpClient {
    client: Client,
    base_url: Url,
    auth: Arc<SessionAuth>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, auth: Arc<SessionAuth>) -> Result<Self, ConsoleError> {
        Self::with_timeout(base_url, auth, Duration::from_secs(30))
    }

    /// Create a new HTTP client with a per-request timeout
    pub fn with_timeout(
        base_url: &str,
        auth: Arc<SessionAuth>,
        timeout: Duration,
    ) -> Result<Self, ConsoleError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(base_url).map_err(|e| ConsoleError::ConfigError(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ConsoleError::ConfigError(format!(
                "Backend URL has no path: {}",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Session the client authenticates with
    pub fn auth(&self) -> &Arc<SessionAuth> {
        &self.auth
    }

    /// Make a GET request; each path segment is percent-encoded
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ConsoleError> {
        let url = join_segments(&self.base_url, segments);
        debug!("GET {}", url);

        let request = self.decorate(self.client.get(url))?;
        self.send(request, "GET").await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ConsoleError> {
        let url = join_segments(&self.base_url, segments);
        debug!("POST {}", url);

        let request = self.decorate(self.client.post(url).json(body))?;
        self.send(request, "POST").await
    }

    /// Attach the session token and a request id
    fn decorate(&self, request: RequestBuilder) -> Result<RequestBuilder, ConsoleError> {
        let bearer = self.auth.bearer()?;
        Ok(request
            .header(header::AUTHORIZATION, bearer)
            .header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string()))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
    ) -> Result<T, ConsoleError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} failed: {} - {}", method, status, body);
            return Err(ConsoleError::BackendError {
                status: status.as_u16(),
                body,
            });
        }

        // Some actions answer with an empty body
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::from_str("null")?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// `base` with `segments` appended to its path, each percent-encoded
pub fn join_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
