//! Daily digest gating and report building.
//!
//! A digest is due once per calendar day (UTC), at or after the configured
//! hour. It summarises the runs that finished in the trailing 24 hours.

use chrono::{DateTime, NaiveDate, TimeDelta, Timelike, Utc};
use logrelay_core::{Checkpoint, StateDocument, Timestamp};
use serde::{Deserialize, Serialize};

/// Hour of day (UTC) from which the digest is sent.
pub const DEFAULT_REPORT_HOUR: u32 = 16;

/// Length of the window a digest covers.
pub const DIGEST_WINDOW_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// DigestSchedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestSchedule {
    hour: u32,
}

impl DigestSchedule {
    /// Hours past 23 are clamped to 23.
    pub fn new(hour: u32) -> Self {
        Self { hour: hour.min(23) }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    /// Whether a digest should be sent at `now`, given the date of the last
    /// one sent.
    pub fn is_due(&self, last_report_date: Option<NaiveDate>, now: DateTime<Utc>) -> bool {
        last_report_date != Some(now.date_naive()) && now.hour() >= self.hour
    }
}

impl Default for DigestSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_HOUR)
    }
}

// ---------------------------------------------------------------------------
// DigestReport
// ---------------------------------------------------------------------------

/// Aggregate of the runs inside one digest window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestReport {
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub runs: usize,
    pub failed_runs: usize,
    pub logs_processed: usize,
    pub checkpoint: Checkpoint,
}

impl DigestReport {
    /// Builds the report for the 24 hours ending at `window_end`.
    pub fn from_history(document: &StateDocument, window_end: Timestamp) -> Self {
        let window_start = window_end - TimeDelta::hours(DIGEST_WINDOW_HOURS);
        let mut report = Self {
            window_start,
            window_end,
            runs: 0,
            failed_runs: 0,
            logs_processed: 0,
            checkpoint: document.checkpoint.clone(),
        };

        for run in document.runs_between(window_start, window_end) {
            report.runs += 1;
            report.logs_processed += run.logs_processed;
            if run.is_failure() {
                report.failed_runs += 1;
            }
        }
        report
    }
}
