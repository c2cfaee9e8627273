//! Durable checkpoint document and the store port.
//!
//! The store holds a single JSON document per relay: the [`Checkpoint`]
//! (cursor + last digest date) and a bounded history of run records used to
//! build periodic digests. The store offers no concurrent-writer protection;
//! only one run per checkpoint may execute at a time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::{LogId, Timestamp};

/// Maximum number of run records kept in the document; oldest are dropped.
pub const MAX_RUN_HISTORY: usize = 500;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Where the relay left off.
///
/// A `None` cursor means "start of stream".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    #[serde(default)]
    pub cursor_id: Option<LogId>,
    #[serde(default)]
    pub last_report_date: Option<NaiveDate>,
}

/// One finished run, kept for digest reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub logs_processed: usize,
    pub cursor_id: Option<LogId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// The whole persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(flatten)]
    pub checkpoint: Checkpoint,
    #[serde(default)]
    pub history: Vec<RunRecord>,
}

impl StateDocument {
    /// Appends a run record, trimming the history to [`MAX_RUN_HISTORY`].
    pub fn record_run(&mut self, record: RunRecord) {
        self.history.push(record);
        if self.history.len() > MAX_RUN_HISTORY {
            let overflow = self.history.len() - MAX_RUN_HISTORY;
            self.history.drain(..overflow);
        }
    }

    /// Runs that finished inside `(start, end]`.
    pub fn runs_between(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> impl Iterator<Item = &RunRecord> + '_ {
        self.history
            .iter()
            .filter(move |r| r.finished_at > start && r.finished_at <= end)
    }
}

// ---------------------------------------------------------------------------
// Store port
// ---------------------------------------------------------------------------

/// Read/write access to the persisted [`StateDocument`].
///
/// `read` on an empty store returns the default document (null cursor).
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn read(&self) -> Result<StateDocument, StoreError>;

    async fn write(&self, document: &StateDocument) -> Result<(), StoreError>;
}

/// Process-local store, used by tests and by dry runs without a database.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    document: Mutex<StateDocument>,
    writes: AtomicUsize,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: StateDocument) -> Self {
        Self {
            document: Mutex::new(document),
            writes: AtomicUsize::new(0),
        }
    }

    /// Copy of the current document.
    pub fn snapshot(&self) -> StateDocument {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful `write` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn read(&self) -> Result<StateDocument, StoreError> {
        Ok(self.snapshot())
    }

    async fn write(&self, document: &StateDocument) -> Result<(), StoreError> {
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = document.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
