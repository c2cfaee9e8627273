//! Filter pipeline applied to each fetched batch.
//!
//! Three stages run in a fixed order, each one only narrowing the sequence:
//!
//! 1. drop the operational-noise type codes in [`EXCLUDED_TYPES`];
//! 2. keep entries whose resolved severity is at least the minimum level,
//!    plus every unclassified entry;
//! 3. when an allow-list is configured, keep only entries whose type code is
//!    on it.

use crate::types::{LogEntry, Severity};

/// Type codes that are always dropped.
pub const EXCLUDED_TYPES: [&str; 2] = ["sapi", "fapi"];

/// Severity threshold plus optional type allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    min_level: Severity,
    /// `None` when no allow-list is configured. Never `Some(empty)`.
    allowed_types: Option<Vec<String>>,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self::new(Severity::Debug, Vec::new())
    }
}

impl LogFilter {
    /// Builds a filter. An empty `allowed_types` means "no allow-list".
    pub fn new(min_level: Severity, allowed_types: Vec<String>) -> Self {
        let allowed_types = if allowed_types.is_empty() {
            None
        } else {
            Some(allowed_types)
        };
        Self {
            min_level,
            allowed_types,
        }
    }

    pub fn min_level(&self) -> Severity {
        self.min_level
    }

    pub fn allowed_types(&self) -> Option<&[String]> {
        self.allowed_types.as_deref()
    }

    /// Runs all three stages over `logs`, preserving order.
    pub fn apply(&self, logs: Vec<LogEntry>) -> Vec<LogEntry> {
        logs.into_iter()
            .filter(|log| !is_excluded(log))
            .filter(|log| self.matches_level(log))
            .filter(|log| self.matches_types(log))
            .collect()
    }

    fn matches_level(&self, log: &LogEntry) -> bool {
        match log.level() {
            Some(level) => level >= self.min_level,
            None => true,
        }
    }

    fn matches_types(&self, log: &LogEntry) -> bool {
        let Some(allowed) = &self.allowed_types else {
            return true;
        };
        log.log_type()
            .is_some_and(|t| allowed.iter().any(|a| a == t))
    }
}

fn is_excluded(log: &LogEntry) -> bool {
    log.log_type()
        .is_some_and(|t| EXCLUDED_TYPES.contains(&t))
}
