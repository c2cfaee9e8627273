//! In-memory collaborators for orchestrator tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use logrelay_core::{
    AuthError, CheckpointStore, DeliveryError, LogEntry, LogFilter, LogId, MemoryCheckpointStore,
    RunResult, Severity, SourceError, StateDocument, StoreError,
};
use logrelay_events::{
    Deliverer, DeliveryMode, DigestReport, DigestSchedule, ReportError, Reporter, WebhookSink,
};
use logrelay_pipeline::{Orchestrator, RunSettings};
use logrelay_source::{LogReader, LogSource};

/// 2026-10-17 at `hour`:00 UTC.
pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, hour, 0, 0).unwrap()
}

pub fn entry(id: u32, log_type: &str) -> LogEntry {
    LogEntry::try_from(json!({ "_id": format!("{id:04}"), "type": log_type })).unwrap()
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderFailure {
    Status(u16),
    Auth,
}

/// Serves a fixed, ordered log stream and records each page request.
#[derive(Default)]
pub struct StreamReader {
    pub logs: Mutex<Vec<LogEntry>>,
    pub failure: Mutex<Option<ReaderFailure>>,
    pub requests: Mutex<Vec<(Option<String>, usize)>>,
}

impl StreamReader {
    pub fn with_logs(logs: Vec<LogEntry>) -> Arc<Self> {
        Arc::new(Self {
            logs: Mutex::new(logs),
            ..Default::default()
        })
    }

    pub fn fail_with(&self, failure: Option<ReaderFailure>) {
        *self.failure.lock().unwrap() = failure;
    }

    pub fn requested_cursors(&self) -> Vec<Option<String>> {
        self.requests.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }
}

#[async_trait]
impl LogReader for StreamReader {
    async fn read_page(
        &self,
        from: Option<&LogId>,
        take: usize,
    ) -> Result<Vec<LogEntry>, SourceError> {
        self.requests
            .lock()
            .unwrap()
            .push((from.map(|c| c.to_string()), take));

        match *self.failure.lock().unwrap() {
            Some(ReaderFailure::Status(status)) => {
                return Err(SourceError::Status {
                    from: from.cloned(),
                    status,
                    body: "unavailable".into(),
                })
            }
            Some(ReaderFailure::Auth) => {
                return Err(SourceError::Auth(AuthError::Rejected {
                    endpoint: "https://tenant.example/oauth/token".into(),
                    status: 401,
                    body: "access_denied".into(),
                }))
            }
            None => {}
        }

        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|e| from.map_or(true, |cursor| e.id() > cursor))
            .take(take)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Accepts every payload except those whose `_id` is in `rejecting`.
#[derive(Default)]
pub struct MemorySink {
    pub received: Mutex<Vec<Value>>,
    pub rejecting: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn reject(&self, ids: &[&str]) {
        *self.rejecting.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn received_ids(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|v| v["_id"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

#[async_trait]
impl WebhookSink for MemorySink {
    async fn send(&self, payload: &Value) -> Result<(), DeliveryError> {
        let id = payload["_id"].as_str().unwrap_or_default().to_string();
        if self.rejecting.lock().unwrap().contains(&id) {
            return Err(DeliveryError::Status {
                url: "http://sink.test/hook".into(),
                status: 500,
                body: format!("rejected {id}"),
            });
        }
        self.received.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`MemoryCheckpointStore`] with switchable read and write failures.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryCheckpointStore,
    pub fail_reads: AtomicBool,
    /// Number of upcoming reads that fail.
    pub failing_reads: AtomicUsize,
    /// Number of upcoming writes that fail.
    pub failing_writes: AtomicUsize,
}

impl FlakyStore {
    pub fn with_document(document: StateDocument) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCheckpointStore::with_document(document),
            ..Default::default()
        })
    }

    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn document(&self) -> StateDocument {
        self.inner.snapshot()
    }
}

#[async_trait]
impl CheckpointStore for FlakyStore {
    async fn read(&self) -> Result<StateDocument, StoreError> {
        let failing = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing || self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Read {
                key: "tenant.example".into(),
                source: Box::new(std::io::Error::other("connection reset")),
            });
        }
        self.inner.read().await
    }

    async fn write(&self, document: &StateDocument) -> Result<(), StoreError> {
        let failing = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Write {
                key: "tenant.example".into(),
                source: Box::new(std::io::Error::other("disk full")),
            });
        }
        self.inner.write(document).await
    }
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingReporter {
    pub runs: Mutex<Vec<RunResult>>,
    pub digests: Mutex<Vec<DigestReport>>,
    pub fail_digests: AtomicBool,
}

impl RecordingReporter {
    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    pub fn digest_count(&self) -> usize {
        self.digests.lock().unwrap().len()
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn report_run(&self, result: &RunResult) -> Result<(), ReportError> {
        self.runs.lock().unwrap().push(result.clone());
        Ok(())
    }

    async fn report_digest(&self, report: &DigestReport) -> Result<(), ReportError> {
        if self.fail_digests.load(Ordering::SeqCst) {
            return Err(ReportError::Status {
                status: 500,
                body: "slack down".into(),
            });
        }
        self.digests.lock().unwrap().push(report.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub reader: Arc<StreamReader>,
    pub sink: Arc<MemorySink>,
    pub store: Arc<FlakyStore>,
    pub reporter: Arc<RecordingReporter>,
    pub orchestrator: Orchestrator,
}

pub struct HarnessBuilder {
    logs: Vec<LogEntry>,
    document: StateDocument,
    filter: LogFilter,
    mode: DeliveryMode,
    settings: RunSettings,
}

impl HarnessBuilder {
    pub fn new(logs: Vec<LogEntry>) -> Self {
        Self {
            logs,
            document: StateDocument::default(),
            filter: LogFilter::default(),
            mode: DeliveryMode::FanOut { concurrency: 1 },
            settings: RunSettings {
                // Keep the digest out of the way unless a test asks for it.
                digest: DigestSchedule::new(23),
                ..RunSettings::default()
            },
        }
    }

    pub fn document(mut self, document: StateDocument) -> Self {
        self.document = document;
        self
    }

    pub fn min_level(mut self, level: Severity) -> Self {
        self.filter = LogFilter::new(level, Vec::new());
        self
    }

    pub fn mode(mut self, mode: DeliveryMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Harness {
        let reader = StreamReader::with_logs(self.logs);
        let sink = Arc::new(MemorySink::default());
        let store = FlakyStore::with_document(self.document);
        let reporter = Arc::new(RecordingReporter::default());

        let orchestrator = Orchestrator::new(
            LogSource::new(reader.clone()),
            self.filter,
            Deliverer::new(sink.clone(), self.mode),
            store.clone(),
            reporter.clone(),
            self.settings,
        );

        Harness {
            reader,
            sink,
            store,
            reporter,
            orchestrator,
        }
    }
}
