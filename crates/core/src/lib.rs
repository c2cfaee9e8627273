//! Domain model for the log relay.
//!
//! This crate holds every type that flows through a relay run (log entries,
//! checkpoints, run results, delivery outcomes), the error taxonomy shared by
//! all infrastructure crates, the fixed log-type severity table, and the
//! filter pipeline. It performs no I/O of its own; the checkpoint store is
//! declared here as a port and implemented by `logrelay-db`.

pub mod checkpoint;
pub mod error;
pub mod filter;
pub mod log_types;
pub mod run;
pub mod types;

pub use checkpoint::{Checkpoint, CheckpointStore, MemoryCheckpointStore, RunRecord, StateDocument};
pub use error::{
    AuthError, BoxError, ConfigError, DeliveryError, EntryError, RelayError, SourceError,
    StoreError,
};
pub use filter::LogFilter;
pub use run::{DeliveryOutcome, ErrorInfo, RunResult, RunStatus, Stage};
pub use types::{LogEntry, LogId, Severity, Timestamp};
