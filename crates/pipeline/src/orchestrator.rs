//! The relay run state machine.
//!
//! ```text
//! Idle -> Fetching -> Filtering -> Delivering -> Committing -> Done
//!            |                         |             |
//!            +-------------------------+-------------+--> Failed
//! ```
//!
//! `Filtering` skips straight to `Committing` when nothing survives the
//! filter; the cursor still advances to the last fetched id. `Failed`
//! writes the start-of-run checkpoint back so the next run re-fetches the
//! same window.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, TimeDelta, Utc};
use logrelay_core::{
    Checkpoint, CheckpointStore, LogEntry, LogFilter, LogId, RelayError, RunRecord, RunResult,
    StateDocument, Timestamp,
};
use logrelay_events::{Deliverer, DigestReport, DigestSchedule, Reporter};
use logrelay_source::{LogSource, PAGE_SIZE};
use tracing::Instrument;
use uuid::Uuid;

/// Upper bound on entries fetched per run.
pub const MAX_BATCH_SIZE: usize = PAGE_SIZE;

/// Per-run tunables.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Entries requested per run, capped at [`MAX_BATCH_SIZE`].
    pub batch_size: usize,
    /// Cursor used while no checkpoint has been stored yet.
    pub start_from: Option<LogId>,
    pub digest: DigestSchedule,
    /// Report successful runs too. Failed runs are always reported.
    pub notify_success: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            start_from: None,
            digest: DigestSchedule::default(),
            notify_success: false,
        }
    }
}

enum RunState {
    Idle,
    Fetching {
        cursor: Option<LogId>,
    },
    Filtering {
        fetched: Vec<LogEntry>,
        high_water: Option<LogId>,
    },
    Delivering {
        logs: Vec<LogEntry>,
        high_water: Option<LogId>,
    },
    Committing {
        cursor: Option<LogId>,
        processed: usize,
    },
    Done(RunResult),
    Failed(RelayError),
}

impl RunState {
    fn name(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Fetching { .. } => "fetching",
            RunState::Filtering { .. } => "filtering",
            RunState::Delivering { .. } => "delivering",
            RunState::Committing { .. } => "committing",
            RunState::Done(_) => "done",
            RunState::Failed(_) => "failed",
        }
    }
}

fn cursor_label(cursor: &Option<LogId>) -> &str {
    cursor.as_ref().map_or("start", LogId::as_str)
}

/// Wall-clock time of the run so far, anchored at the run's logical start.
fn clock(now: DateTime<Utc>, started: Instant) -> Timestamp {
    now + TimeDelta::from_std(started.elapsed()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    source: LogSource,
    filter: LogFilter,
    deliverer: Deliverer,
    store: Arc<dyn CheckpointStore>,
    reporter: Arc<dyn Reporter>,
    settings: RunSettings,
}

impl Orchestrator {
    pub fn new(
        source: LogSource,
        filter: LogFilter,
        deliverer: Deliverer,
        store: Arc<dyn CheckpointStore>,
        reporter: Arc<dyn Reporter>,
        settings: RunSettings,
    ) -> Self {
        Self {
            source,
            filter,
            deliverer,
            store,
            reporter,
            settings,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Executes one run now.
    pub async fn run(&self) -> RunResult {
        self.run_at(Utc::now()).await
    }

    /// Executes one run whose logical start time is `now`.
    ///
    /// Never returns an error: failures are carried in the result, which
    /// holds the unchanged start-of-run checkpoint in that case. The digest
    /// is evaluated after every run; when the checkpoint could not be read
    /// at start, it is read once more for that.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunResult {
        let run_id = Uuid::new_v4();
        async move {
            let started = Instant::now();

            let stored = match self.store.read().await {
                Ok(document) => document,
                Err(e) => {
                    let err = RelayError::from(e);
                    tracing::error!(error = %err, "Could not read checkpoint, run aborted");
                    let result = RunResult::failed(Checkpoint::default(), &err);
                    self.notify(&result).await;
                    match self.store.read().await {
                        Ok(mut document) => self.evaluate_digest(&mut document, now, started).await,
                        Err(e) => tracing::warn!(error = %e, "Digest skipped, checkpoint unreadable"),
                    }
                    return result;
                }
            };
            tracing::info!(
                cursor = cursor_label(&stored.checkpoint.cursor_id),
                "Relay run started"
            );

            let (result, mut document) = self.execute(stored, now, started).await;
            self.notify(&result).await;
            self.evaluate_digest(&mut document, now, started).await;
            result
        }
        .instrument(tracing::info_span!("relay_run", %run_id))
        .await
    }

    async fn execute(
        &self,
        stored: StateDocument,
        now: DateTime<Utc>,
        started: Instant,
    ) -> (RunResult, StateDocument) {
        let mut document = stored.clone();
        let mut state = RunState::Idle;

        loop {
            tracing::debug!(state = state.name(), "Run state");
            state = match state {
                RunState::Idle => RunState::Fetching {
                    cursor: stored
                        .checkpoint
                        .cursor_id
                        .clone()
                        .or_else(|| self.settings.start_from.clone()),
                },

                RunState::Fetching { cursor } => {
                    let batch_size = self.settings.batch_size.min(MAX_BATCH_SIZE);
                    match self.source.fetch(cursor.as_ref(), batch_size).await {
                        Ok(fetched) => RunState::Filtering {
                            high_water: fetched.last().map(|e| e.id().clone()).or(cursor),
                            fetched,
                        },
                        Err(e) => RunState::Failed(e.into()),
                    }
                }

                RunState::Filtering {
                    fetched,
                    high_water,
                } => {
                    let fetched_count = fetched.len();
                    let logs = self.filter.apply(fetched);
                    tracing::info!(fetched = fetched_count, kept = logs.len(), "Logs filtered");

                    if logs.is_empty() {
                        RunState::Committing {
                            cursor: high_water,
                            processed: 0,
                        }
                    } else {
                        RunState::Delivering { logs, high_water }
                    }
                }

                RunState::Delivering { logs, high_water } => {
                    match self.deliverer.deliver(&logs).await.into_first_error() {
                        Some(e) => RunState::Failed(e.into()),
                        None => RunState::Committing {
                            cursor: high_water,
                            processed: logs.len(),
                        },
                    }
                }

                RunState::Committing { cursor, processed } => {
                    let record = RunRecord {
                        started_at: now,
                        finished_at: clock(now, started),
                        logs_processed: processed,
                        cursor_id: cursor.clone(),
                        error: None,
                    };
                    document.checkpoint.cursor_id = cursor;
                    document.record_run(record);

                    match self.store.write(&document).await {
                        Ok(()) => RunState::Done(RunResult::succeeded(
                            document.checkpoint.clone(),
                            processed,
                        )),
                        Err(e) => RunState::Failed(e.into()),
                    }
                }

                RunState::Done(result) => {
                    tracing::info!(
                        logs_processed = result.logs_processed,
                        cursor = cursor_label(&result.checkpoint.cursor_id),
                        "Relay run committed"
                    );
                    return (result, document);
                }

                RunState::Failed(err) => return self.rollback(stored, err, now, started).await,
            };
        }
    }

    /// Writes the start-of-run checkpoint back, with a failed run record
    /// appended.
    async fn rollback(
        &self,
        stored: StateDocument,
        err: RelayError,
        now: DateTime<Utc>,
        started: Instant,
    ) -> (RunResult, StateDocument) {
        tracing::error!(stage = ?err.stage(), error = %err, "Relay run failed, rolling back checkpoint");

        let mut document = stored;
        let record = RunRecord {
            started_at: now,
            finished_at: clock(now, started),
            logs_processed: 0,
            cursor_id: document.checkpoint.cursor_id.clone(),
            error: Some(err.to_string()),
        };
        document.record_run(record);

        let err = match self.store.write(&document).await {
            Ok(()) => err,
            Err(source) => {
                tracing::error!(error = %source, "Checkpoint rollback failed");
                RelayError::Rollback {
                    run_error: Box::new(err),
                    source,
                }
            }
        };

        (RunResult::failed(document.checkpoint.clone(), &err), document)
    }

    async fn notify(&self, result: &RunResult) {
        if !result.is_failure() && !self.settings.notify_success {
            return;
        }
        if let Err(e) = self.reporter.report_run(result).await {
            tracing::warn!(error = %e, "Failed to send run report");
        }
    }

    /// Sends the daily digest when due and persists the report date. The
    /// date is only stored once the reporter accepted the digest.
    async fn evaluate_digest(
        &self,
        document: &mut StateDocument,
        now: DateTime<Utc>,
        started: Instant,
    ) {
        if !self
            .settings
            .digest
            .is_due(document.checkpoint.last_report_date, now)
        {
            return;
        }

        let report = DigestReport::from_history(document, clock(now, started));
        if let Err(e) = self.reporter.report_digest(&report).await {
            tracing::warn!(error = %e, "Failed to send daily digest");
            return;
        }

        document.checkpoint.last_report_date = Some(now.date_naive());
        match self.store.write(document).await {
            Ok(()) => tracing::info!(
                runs = report.runs,
                logs_processed = report.logs_processed,
                "Daily digest sent"
            ),
            Err(e) => tracing::warn!(error = %e, "Failed to store digest date"),
        }
    }
}
