//! Results produced by a relay run and by the delivery stage.

use serde::{Deserialize, Serialize};

use crate::checkpoint::Checkpoint;
use crate::error::{DeliveryError, RelayError};

// ---------------------------------------------------------------------------
// ErrorInfo
// ---------------------------------------------------------------------------

/// Pipeline stage an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Config,
    Auth,
    Source,
    Delivery,
    CheckpointStore,
}

/// Serializable summary of a [`RelayError`], rendered for reporters and the
/// trigger response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub stage: Stage,
    pub message: String,
}

impl From<&RelayError> for ErrorInfo {
    fn from(err: &RelayError) -> Self {
        Self {
            stage: err.stage(),
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// RunResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Outcome of one relay run.
///
/// On failure `checkpoint` is the unchanged start-of-run checkpoint and
/// `logs_processed` is zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub checkpoint: Checkpoint,
    pub logs_processed: usize,
    pub status: RunStatus,
}

impl RunResult {
    pub fn succeeded(checkpoint: Checkpoint, logs_processed: usize) -> Self {
        Self {
            checkpoint,
            logs_processed,
            status: RunStatus::default(),
        }
    }

    pub fn failed(checkpoint: Checkpoint, error: &RelayError) -> Self {
        Self {
            checkpoint,
            logs_processed: 0,
            status: RunStatus {
                error: Some(ErrorInfo::from(error)),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status.error.is_some()
    }
}

// ---------------------------------------------------------------------------
// DeliveryOutcome
// ---------------------------------------------------------------------------

/// Tally of one `deliver` call, counted in log entries.
///
/// `errors` holds failures in the order they were observed.
#[derive(Debug, Default)]
pub struct DeliveryOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<DeliveryError>,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }

    /// Consumes the outcome, yielding the first observed failure if any.
    pub fn into_first_error(self) -> Option<DeliveryError> {
        self.errors.into_iter().next()
    }
}
