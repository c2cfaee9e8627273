//! Run and digest notifications.
//!
//! Reporting is best effort: callers log a [`ReportError`] and carry on.

use async_trait::async_trait;
use logrelay_core::RunResult;

use crate::digest::DigestReport;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("Report request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The notification endpoint returned a non-2xx status code.
    #[error("Report endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Renders run results and digests for humans.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report_run(&self, result: &RunResult) -> Result<(), ReportError>;

    async fn report_digest(&self, report: &DigestReport) -> Result<(), ReportError>;
}

/// Writes reports to the log only. Used when no notification channel is
/// configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

#[async_trait]
impl Reporter for TracingReporter {
    async fn report_run(&self, result: &RunResult) -> Result<(), ReportError> {
        let cursor = result
            .checkpoint
            .cursor_id
            .as_ref()
            .map_or("start", |c| c.as_str());
        match &result.status.error {
            Some(error) => tracing::error!(
                stage = ?error.stage,
                cursor,
                error = %error.message,
                "Relay run failed"
            ),
            None => tracing::info!(
                logs_processed = result.logs_processed,
                cursor,
                "Relay run succeeded"
            ),
        }
        Ok(())
    }

    async fn report_digest(&self, report: &DigestReport) -> Result<(), ReportError> {
        tracing::info!(
            window_start = %report.window_start,
            window_end = %report.window_end,
            runs = report.runs,
            failed_runs = report.failed_runs,
            logs_processed = report.logs_processed,
            "Daily relay digest"
        );
        Ok(())
    }
}
