//! Error taxonomy for a relay run.
//!
//! Each component returns its own error type; [`RelayError`] wraps them so
//! the orchestrator can tell which stage failed without losing the
//! underlying cause.

use std::sync::Arc;

use crate::run::Stage;
use crate::types::LogId;

/// Type-erased transport or codec failure kept as an error source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A raw source record could not be decoded into a [`LogEntry`](crate::LogEntry).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    #[error("Log record is not a JSON object")]
    NotAnObject,

    #[error("Log record has no usable `_id`")]
    MissingId,
}

/// Required settings are missing or a setting cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing settings: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Client-credential exchange against the source's token endpoint failed.
///
/// `Clone` because one in-flight exchange fans its result out to every
/// waiting caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Token request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    #[error("Token endpoint {endpoint} returned HTTP {status}: {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Token endpoint {endpoint} returned an unusable response: {message}")]
    Malformed { endpoint: String, message: String },
}

/// Reading a page from the event source failed.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Could not obtain a source credential: {0}")]
    Auth(#[from] AuthError),

    #[error("Log page request from {} failed: {source}", cursor_label(.from))]
    Request {
        from: Option<LogId>,
        #[source]
        source: BoxError,
    },

    #[error("Log endpoint returned HTTP {status} for page from {}: {body}", cursor_label(.from))]
    Status {
        from: Option<LogId>,
        status: u16,
        body: String,
    },

    #[error("Log page from {} could not be decoded: {source}", cursor_label(.from))]
    Decode {
        from: Option<LogId>,
        #[source]
        source: BoxError,
    },
}

fn cursor_label(cursor: &Option<LogId>) -> String {
    cursor
        .as_ref()
        .map_or_else(|| "start of stream".to_string(), LogId::to_string)
}

/// A webhook call failed.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("Webhook request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The sink answered outside the accepted `[200, 400)` band.
    #[error("Webhook {url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// A delivery worker ended without producing a result (panic or abort).
    #[error("Delivery worker failed: {0}")]
    Worker(String),
}

/// The checkpoint store could not be read or written.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read checkpoint {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to write checkpoint {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("Stored checkpoint {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a relay run failed.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Fetching logs failed: {0}")]
    Source(SourceError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Checkpoint store failed: {0}")]
    CheckpointStore(#[from] StoreError),

    /// The run failed and writing the start checkpoint back failed too.
    #[error("Checkpoint rollback failed ({source}) after: {run_error}")]
    Rollback {
        run_error: Box<RelayError>,
        #[source]
        source: StoreError,
    },
}

impl From<SourceError> for RelayError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Auth(auth) => RelayError::Auth(auth),
            other => RelayError::Source(other),
        }
    }
}

impl RelayError {
    /// The pipeline stage the error is attributed to.
    pub fn stage(&self) -> Stage {
        match self {
            RelayError::Config(_) => Stage::Config,
            RelayError::Auth(_) => Stage::Auth,
            RelayError::Source(_) => Stage::Source,
            RelayError::Delivery(_) => Stage::Delivery,
            RelayError::CheckpointStore(_) | RelayError::Rollback { .. } => Stage::CheckpointStore,
        }
    }
}
