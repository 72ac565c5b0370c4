//! Push channel worker: keeps the status stream of one deployment alive

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::errors::ChannelError;
use crate::pipeline::{Pipeline, PushChannel};
use crate::status::reconcile::{statuses_from_push, StatusSource};
use crate::status::tracker::{poll_once, ChannelState, TrackerShared};
use crate::utils::{Backoff, BackoffOptions};

/// Relay worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Bounded wait for the handshake
    pub handshake_timeout: Duration,

    /// Reconnect delay on failure
    pub reconnect: BackoffOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            reconnect: BackoffOptions::default(),
        }
    }
}

/// Run the relay worker until shutdown or a final status
pub async fn run<S, F>(
    options: &Options,
    pipeline: Arc<dyn Pipeline>,
    channel: Arc<dyn PushChannel>,
    shared: Arc<TrackerShared>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let tracking_id = shared.tracking_id().to_string();
    info!("Relay worker starting for {}...", tracking_id);

    let mut backoff = Backoff::new(options.reconnect.clone());

    loop {
        if shared.is_final() {
            break;
        }

        shared.set_channel_state(ChannelState::Connecting);
        let handshake = tokio::time::timeout(options.handshake_timeout, channel.open(&tracking_id));

        let opened = tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Relay worker for {} shutting down...", tracking_id);
                break;
            }
            result = handshake => match result {
                Ok(result) => result,
                Err(_) => Err(ChannelError::HandshakeTimeout(options.handshake_timeout)),
            },
        };

        match opened {
            Ok(mut stream) => {
                backoff.reset();
                shared.set_channel_state(ChannelState::Connected);
                info!("Status channel connected for {}", tracking_id);

                // Catch up on anything missed while disconnected
                tokio::select! {
                    _ = &mut shutdown_signal => break,
                    _ = poll_once(pipeline.as_ref(), &shared) => {}
                }

                loop {
                    if shared.is_final() {
                        break;
                    }
                    tokio::select! {
                        _ = &mut shutdown_signal => {
                            info!("Relay worker for {} shutting down connection...", tracking_id);
                            shared.set_channel_state(ChannelState::Disconnected);
                            return;
                        }
                        msg = stream.next() => match msg {
                            Some(Ok(msg)) => {
                                shared.observe(statuses_from_push(&msg), StatusSource::Push);
                            }
                            Some(Err(ChannelError::Malformed(e))) => {
                                debug!("Skipping malformed status message: {}", e);
                            }
                            Some(Err(e)) => {
                                warn!("Status channel for {} failed: {}", tracking_id, e);
                                break;
                            }
                            None => {
                                warn!("Status channel for {} closed", tracking_id);
                                break;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Failed to open status channel for {}: {}", tracking_id, e);
            }
        }

        shared.set_channel_state(ChannelState::Disconnected);
        if shared.is_final() {
            break;
        }

        let delay = backoff.next_delay();
        info!("Reconnecting status channel for {} in {:?}...", tracking_id, delay);

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Relay worker for {} shutting down...", tracking_id);
                break;
            }
            _ = sleep_fn(delay) => {}
        }
    }

    shared.set_channel_state(ChannelState::Disconnected);
    debug!("Relay worker for {} stopped", tracking_id);
}
