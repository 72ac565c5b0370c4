//! Polling worker: periodic status cross-check for one deployment

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::pipeline::Pipeline;
use crate::status::tracker::{poll_once, ChannelState, TrackerShared};

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,

    /// Keep polling while the push channel is connected
    pub poll_while_connected: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            poll_while_connected: true,
        }
    }
}

/// Run the poller worker until shutdown or a final status
pub async fn run<S, F>(
    options: &Options,
    pipeline: Arc<dyn Pipeline>,
    shared: Arc<TrackerShared>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Poller worker starting for {}...", shared.tracking_id());

    loop {
        if shared.is_final() {
            debug!("Deployment {} is final, poller stopping", shared.tracking_id());
            return;
        }

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Poller worker for {} shutting down...", shared.tracking_id());
                return;
            }
            _ = sleep_fn(options.interval) => {}
        }

        if !options.poll_while_connected && shared.channel_state() == ChannelState::Connected {
            continue;
        }

        debug!("Polling status of {}...", shared.tracking_id());
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Poller worker for {} shutting down...", shared.tracking_id());
                return;
            }
            _ = poll_once(pipeline.as_ref(), &shared) => {}
        }
    }
}
