use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EntryError;
use crate::log_types;

/// All timestamps are UTC.
pub type Timestamp = DateTime<Utc>;

// ---------------------------------------------------------------------------
// LogId
// ---------------------------------------------------------------------------

/// Opaque, ordered identifier assigned by the event source.
///
/// Identifiers are non-decreasing in emission order, which makes the id of
/// the last processed entry usable as the cursor for the next read.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(String);

impl LogId {
    /// Creates an identifier, returning `None` if the value is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity of a log type, from `0` (debug) to `4` (critical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
    Critical = 4,
}

impl Severity {
    /// Maps a numeric level onto a severity, `None` when out of range.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Debug),
            1 => Some(Self::Info),
            2 => Some(Self::Warning),
            3 => Some(Self::Error),
            4 => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn as_level(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// LogEntry
// ---------------------------------------------------------------------------

/// One record read from the event source.
///
/// The full source record is kept as `payload` and is what the webhook sink
/// receives; `id`, `log_type`, `timestamp` and the resolved `level` are
/// extracted once at decode time. `level` is `None` for type codes the
/// severity table does not classify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct LogEntry {
    id: LogId,
    log_type: Option<String>,
    level: Option<Severity>,
    timestamp: Option<Timestamp>,
    payload: Value,
}

impl LogEntry {
    pub fn id(&self) -> &LogId {
        &self.id
    }

    /// Type code of the record (e.g. `"s"`, `"fp"`), if present.
    pub fn log_type(&self) -> Option<&str> {
        self.log_type.as_deref()
    }

    /// Severity resolved from the type code via [`log_types::lookup`].
    pub fn level(&self) -> Option<Severity> {
        self.level
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    /// The untouched source record.
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

impl TryFrom<Value> for LogEntry {
    type Error = EntryError;

    /// Decodes a raw source record.
    ///
    /// The identifier is read from `_id`, falling back to `log_id`; string
    /// and numeric identifiers are both accepted.
    fn try_from(payload: Value) -> Result<Self, Self::Error> {
        let object = payload.as_object().ok_or(EntryError::NotAnObject)?;

        let raw_id = object
            .get("_id")
            .or_else(|| object.get("log_id"))
            .ok_or(EntryError::MissingId)?;
        let id = match raw_id {
            Value::String(s) => LogId::new(s.clone()),
            Value::Number(n) => LogId::new(n.to_string()),
            _ => None,
        }
        .ok_or(EntryError::MissingId)?;

        let log_type = object
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let level = log_type
            .as_deref()
            .and_then(log_types::lookup)
            .and_then(|t| t.level);

        let timestamp = object
            .get("date")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));

        Ok(Self {
            id,
            log_type,
            level,
            timestamp,
            payload,
        })
    }
}

impl From<LogEntry> for Value {
    fn from(entry: LogEntry) -> Self {
        entry.payload
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_id_type_level_and_date() {
        let entry = LogEntry::try_from(json!({
            "_id": "90020240101000000000000000000000000000001",
            "type": "fp",
            "date": "2024-01-01T10:00:00.000Z",
            "description": "Wrong email or password."
        }))
        .unwrap();

        assert_eq!(entry.id().as_str(), "90020240101000000000000000000000000000001");
        assert_eq!(entry.log_type(), Some("fp"));
        assert_eq!(entry.level(), Some(Severity::Error));
        assert_eq!(
            entry.timestamp().unwrap().to_rfc3339(),
            "2024-01-01T10:00:00+00:00"
        );
        assert_eq!(entry.payload()["description"], "Wrong email or password.");
    }

    #[test]
    fn falls_back_to_log_id_field() {
        let entry = LogEntry::try_from(json!({ "log_id": 42, "type": "s" })).unwrap();
        assert_eq!(entry.id().as_str(), "42");
        assert_eq!(entry.level(), Some(Severity::Info));
    }

    #[test]
    fn unknown_type_has_no_level() {
        let entry = LogEntry::try_from(json!({ "_id": "1", "type": "brand_new_type" })).unwrap();
        assert_eq!(entry.level(), None);
    }

    #[test]
    fn missing_id_is_rejected() {
        assert_matches!(
            LogEntry::try_from(json!({ "type": "s" })),
            Err(EntryError::MissingId)
        );
        assert_matches!(
            LogEntry::try_from(json!({ "_id": "" })),
            Err(EntryError::MissingId)
        );
    }

    #[test]
    fn non_object_is_rejected() {
        assert_matches!(LogEntry::try_from(json!([1, 2])), Err(EntryError::NotAnObject));
    }

    #[test]
    fn serializes_back_to_the_source_record() {
        let raw = json!({ "_id": "7", "type": "w", "extra": { "nested": true } });
        let entry = LogEntry::try_from(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&entry).unwrap(), raw);
    }

    #[test]
    fn log_ids_order_lexicographically() {
        let a = LogId::new("9002024010100").unwrap();
        let b = LogId::new("9002024010101").unwrap();
        assert!(a < b);
        assert!(LogId::new("").is_none());
    }

    #[test]
    fn severity_levels_round_trip() {
        for level in 0..=4 {
            assert_eq!(Severity::from_level(level).unwrap().as_level(), level);
        }
        assert!(Severity::from_level(5).is_none());
        assert!(Severity::Critical > Severity::Debug);
    }
}
