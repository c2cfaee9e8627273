//! Fixed classification of event-source log type codes.
//!
//! The table maps each known type code to a human-readable event name and a
//! [`Severity`]. Codes missing from the table are *unclassified* and the
//! filter always keeps them. `sapi` and `fapi` are listed without a level;
//! they are operational noise and the filter drops them before the severity
//! check is reached.

use crate::types::Severity;

/// One row of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogType {
    pub code: &'static str,
    pub event: &'static str,
    pub level: Option<Severity>,
}

const fn classified(code: &'static str, event: &'static str, level: Severity) -> LogType {
    LogType {
        code,
        event,
        level: Some(level),
    }
}

pub const LOG_TYPES: &[LogType] = &[
    classified("s", "Success Login", Severity::Info),
    classified("seacft", "Success Exchange", Severity::Info),
    classified("feacft", "Failed Exchange", Severity::Error),
    classified("f", "Failed Login", Severity::Error),
    classified("w", "Warnings During Login", Severity::Warning),
    classified("du", "Deleted User", Severity::Info),
    classified("fu", "Failed Login (invalid email/username)", Severity::Error),
    classified("fp", "Failed Login (wrong password)", Severity::Error),
    classified("fc", "Failed by Connector", Severity::Error),
    classified("fco", "Failed by CORS", Severity::Error),
    classified("con", "Connector Online", Severity::Info),
    classified("coff", "Connector Offline", Severity::Error),
    classified("fcpro", "Failed Connector Provisioning", Severity::Critical),
    classified("ss", "Success Signup", Severity::Info),
    classified("fs", "Failed Signup", Severity::Error),
    classified("cs", "Code Sent", Severity::Debug),
    classified("cls", "Code/Link Sent", Severity::Debug),
    classified("sv", "Success Verification Email", Severity::Debug),
    classified("fv", "Failed Verification Email", Severity::Debug),
    classified("scp", "Success Change Password", Severity::Info),
    classified("fcp", "Failed Change Password", Severity::Error),
    classified("sce", "Success Change Email", Severity::Info),
    classified("fce", "Failed Change Email", Severity::Error),
    classified("scu", "Success Change Username", Severity::Info),
    classified("fcu", "Failed Change Username", Severity::Error),
    classified("scpn", "Success Change Phone Number", Severity::Info),
    classified("fcpn", "Failed Change Phone Number", Severity::Error),
    classified("svr", "Success Verification Email Request", Severity::Debug),
    classified("fvr", "Failed Verification Email Request", Severity::Error),
    classified("scpr", "Success Change Password Request", Severity::Debug),
    classified("fcpr", "Failed Change Password Request", Severity::Error),
    classified("fn", "Failed Sending Notification", Severity::Error),
    LogType {
        code: "sapi",
        event: "API Operation",
        level: None,
    },
    LogType {
        code: "fapi",
        event: "Failed API Operation",
        level: None,
    },
    classified("limit_wc", "Blocked Account", Severity::Critical),
    classified("limit_ui", "Too Many Calls to /userinfo", Severity::Critical),
    classified("api_limit", "Rate Limit On API", Severity::Critical),
    classified("sdu", "Successful User Deletion", Severity::Info),
    classified("fdu", "Failed User Deletion", Severity::Error),
];

/// Looks up a type code, `None` when the code is unclassified.
pub fn lookup(code: &str) -> Option<&'static LogType> {
    LOG_TYPES.iter().find(|t| t.code == code)
}
