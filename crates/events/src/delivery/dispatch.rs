//! Batch and bounded fan-out delivery of filtered log entries.
//!
//! Fan-out is fail-fast: at most `concurrency` calls are in flight, the
//! first failure flips a shared abort flag, and no call is dispatched once
//! the flag is set. Calls already in flight are awaited before `deliver`
//! returns, so the outcome accounts for every call that was started.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use logrelay_core::{DeliveryError, DeliveryOutcome, LogEntry, LogId};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use super::webhook::WebhookSink;

/// Default number of concurrent fan-out calls.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Upper bound on concurrent fan-out calls; equal to the largest batch a
/// run fetches.
pub const MAX_CONCURRENCY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// One call carrying every entry as a JSON array.
    Batch,
    /// One call per entry, at most `concurrency` in flight.
    FanOut { concurrency: usize },
}

impl Default for DeliveryMode {
    fn default() -> Self {
        DeliveryMode::FanOut {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

pub struct Deliverer {
    sink: Arc<dyn WebhookSink>,
    mode: DeliveryMode,
}

impl Deliverer {
    /// The fan-out concurrency is clamped to `1..=MAX_CONCURRENCY`.
    pub fn new(sink: Arc<dyn WebhookSink>, mode: DeliveryMode) -> Self {
        let mode = match mode {
            DeliveryMode::FanOut { concurrency } => DeliveryMode::FanOut {
                concurrency: concurrency.clamp(1, MAX_CONCURRENCY),
            },
            DeliveryMode::Batch => DeliveryMode::Batch,
        };
        Self { sink, mode }
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Delivers `logs` to the sink. An empty slice makes no call.
    pub async fn deliver(&self, logs: &[LogEntry]) -> DeliveryOutcome {
        if logs.is_empty() {
            return DeliveryOutcome::default();
        }

        let outcome = match self.mode {
            DeliveryMode::Batch => self.deliver_batch(logs).await,
            DeliveryMode::FanOut { concurrency } => self.fan_out(logs, concurrency).await,
        };

        tracing::info!(
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "Delivery finished"
        );
        outcome
    }

    async fn deliver_batch(&self, logs: &[LogEntry]) -> DeliveryOutcome {
        let payload = serde_json::Value::Array(logs.iter().map(|e| e.payload().clone()).collect());
        let mut outcome = DeliveryOutcome {
            attempted: logs.len(),
            ..DeliveryOutcome::default()
        };

        match self.sink.send(&payload).await {
            Ok(()) => outcome.succeeded = logs.len(),
            Err(e) => {
                tracing::warn!(count = logs.len(), error = %e, "Batch delivery failed");
                outcome.failed = logs.len();
                outcome.errors.push(e);
            }
        }
        outcome
    }

    async fn fan_out(&self, logs: &[LogEntry], concurrency: usize) -> DeliveryOutcome {
        let permits = Arc::new(Semaphore::new(concurrency));
        let abort = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();
        let mut outcome = DeliveryOutcome::default();

        for entry in logs {
            while let Some(joined) = tasks.try_join_next() {
                record(&mut outcome, &abort, joined);
            }

            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            if abort.load(Ordering::SeqCst) {
                tracing::debug!(
                    pending = logs.len() - outcome.attempted,
                    "Fan-out stopped after a failed call"
                );
                break;
            }

            outcome.attempted += 1;
            let sink = Arc::clone(&self.sink);
            let abort = Arc::clone(&abort);
            let id = entry.id().clone();
            let payload = entry.payload().clone();

            tasks.spawn(async move {
                let _permit = permit;
                let result = sink.send(&payload).await;
                if result.is_err() {
                    // Set before the permit is released so the next dispatch sees it.
                    abort.store(true, Ordering::SeqCst);
                }
                (id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            record(&mut outcome, &abort, joined);
        }
        outcome
    }
}

fn record(
    outcome: &mut DeliveryOutcome,
    abort: &AtomicBool,
    joined: Result<(LogId, Result<(), DeliveryError>), JoinError>,
) {
    match joined {
        Ok((_, Ok(()))) => outcome.succeeded += 1,
        Ok((id, Err(e))) => {
            tracing::warn!(log_id = %id, error = %e, "Log delivery failed");
            outcome.failed += 1;
            outcome.errors.push(e);
        }
        Err(e) => {
            abort.store(true, Ordering::SeqCst);
            outcome.failed += 1;
            outcome.errors.push(DeliveryError::Worker(e.to_string()));
        }
    }
}
