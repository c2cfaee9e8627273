//! Interval-driven runs.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::relay::Relay;

/// Triggers a run every `interval` until cancelled. The first run starts
/// immediately; a tick that finds a run still executing is skipped.
pub struct RunScheduler {
    relay: Arc<Relay>,
    interval: Duration,
}

impl RunScheduler {
    pub fn new(relay: Arc<Relay>, interval: Duration) -> Self {
        Self { relay, interval }
    }

    /// Run the scheduler loop.
    ///
    /// The loop exits when the provided [`CancellationToken`] is cancelled.
    /// A run in progress at that moment is finished first.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "Run scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Run scheduler cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.relay.try_run().await {
                        Some(result) if result.is_failure() => {
                            tracing::warn!("Scheduled run failed");
                        }
                        Some(result) => {
                            tracing::debug!(logs_processed = result.logs_processed, "Scheduled run finished");
                        }
                        None => tracing::info!("Previous run still executing, skipping tick"),
                    }
                }
            }
        }
    }
}
