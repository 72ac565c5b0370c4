//! WebSocket push channel for deployment status

use std::sync::Arc;

use async_trait::async_trait;
use futures::{future, StreamExt};
use http::header::{HeaderValue, AUTHORIZATION, USER_AGENT};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use tracing::{debug, info, warn};
use url::Url;

use openapi_client::models::StatusPushMessage;

use crate::authn::session::SessionAuth;
use crate::errors::{ChannelError, ConsoleError};
use crate::http::client::join_segments;
use crate::pipeline::{PushChannel, PushStream};

/// Push channel backed by the pipeline's status WebSocket
pub struct WsPushChannel {
    base_url: Url,
    auth: Arc<SessionAuth>,
}

impl WsPushChannel {
    /// Create a channel from a ws(s) base URL, or an http(s) URL to convert
    pub fn new(base_url: &str, auth: Arc<SessionAuth>) -> Result<Self, ConsoleError> {
        Ok(Self {
            base_url: build_push_base_url(base_url)?,
            auth,
        })
    }

    /// Status stream URL of one deployment
    pub fn status_url(&self, tracking_id: &str) -> Url {
        join_segments(&self.base_url, &["ws", "pr-status", tracking_id])
    }
}

#[async_trait]
impl PushChannel for WsPushChannel {
    async fn open(&self, tracking_id: &str) -> Result<PushStream, ChannelError> {
        let url = self.status_url(tracking_id);
        info!("Connecting to status channel: {}", url);

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| ChannelError::Handshake(e.to_string()))?;

        let bearer = self
            .auth
            .bearer()
            .map_err(|e| ChannelError::Handshake(e.to_string()))?;
        let bearer =
            HeaderValue::from_str(&bearer).map_err(|e| ChannelError::Handshake(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);
        request
            .headers_mut()
            .insert(USER_AGENT, HeaderValue::from_static("deployctl"));

        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| ChannelError::Handshake(e.to_string()))?;

        let stream = ws_stream
            .take_while(|frame| future::ready(!matches!(frame, Ok(Message::Close(_)))))
            .filter_map(|frame| future::ready(decode_frame(frame)))
            .boxed();

        Ok(stream)
    }
}

fn decode_frame(frame: Result<Message, WsError>) -> Option<Result<StatusPushMessage, ChannelError>> {
    match frame {
        Ok(Message::Text(text)) => {
            debug!("Received status message: {}", text.as_str());
            Some(parse_message(text.as_bytes()))
        }
        Ok(Message::Binary(bytes)) => Some(parse_message(&bytes)),
        Ok(_) => None,
        Err(e) => {
            warn!("Status channel transport error: {}", e);
            Some(Err(ChannelError::Transport(e.to_string())))
        }
    }
}

fn parse_message(bytes: &[u8]) -> Result<StatusPushMessage, ChannelError> {
    serde_json::from_slice(bytes).map_err(|e| ChannelError::Malformed(e.to_string()))
}

/// Switch an http(s) base URL to ws(s); ws(s) URLs pass through
pub fn build_push_base_url(base_url: &str) -> Result<Url, ConsoleError> {
    let mut url = Url::parse(base_url).map_err(|e| ConsoleError::ConfigError(e.to_string()))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => {
            return Err(ConsoleError::ConfigError(
                "Invalid push channel URL scheme".to_string(),
            ))
        }
    };

    url.set_scheme(scheme)
        .map_err(|_| ConsoleError::ConfigError("Failed to set scheme".to_string()))?;

    Ok(url)
}
