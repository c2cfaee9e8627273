//! Slack incoming-webhook reporter.

use std::time::Duration;

use async_trait::async_trait;
use logrelay_core::{Checkpoint, RunResult};
use serde_json::{json, Value};

use crate::digest::DigestReport;
use crate::reporter::{ReportError, Reporter};

const COLOR_SUCCESS: &str = "#7CD197";
const COLOR_FAILURE: &str = "#F35A00";
const COLOR_DIGEST: &str = "#3AA3E3";

/// Sender name shown for every message.
pub const DEFAULT_USERNAME: &str = "auth0-authentication-api-webhooks";
/// Title placed on every message attachment.
pub const DEFAULT_TITLE: &str = "Authentication Api Webhooks";

/// Posts run results and digests to a Slack incoming webhook.
pub struct SlackReporter {
    client: reqwest::Client,
    hook_url: String,
    username: String,
    title: String,
}

impl SlackReporter {
    pub fn new(hook_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            hook_url: hook_url.into(),
            username: DEFAULT_USERNAME.to_string(),
            title: DEFAULT_TITLE.to_string(),
        })
    }

    /// Overrides the sender name and attachment title.
    pub fn with_identity(mut self, username: impl Into<String>, title: impl Into<String>) -> Self {
        self.username = username.into();
        self.title = title.into();
        self
    }

    async fn post(&self, message: Value) -> Result<(), ReportError> {
        let message = stamp_identity(message, &self.username, &self.title);
        let response = self.client.post(&self.hook_url).json(&message).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Reporter for SlackReporter {
    async fn report_run(&self, result: &RunResult) -> Result<(), ReportError> {
        self.post(run_message(result)).await
    }

    async fn report_digest(&self, report: &DigestReport) -> Result<(), ReportError> {
        self.post(digest_message(report)).await
    }
}

// ---------------------------------------------------------------------------
// Message bodies
// ---------------------------------------------------------------------------

/// Stamps the sender name on `message` and the title on each attachment.
pub fn stamp_identity(mut message: Value, username: &str, title: &str) -> Value {
    if let Some(attachments) = message["attachments"].as_array_mut() {
        for attachment in attachments.iter_mut().filter_map(Value::as_object_mut) {
            attachment.insert("title".into(), json!(title));
        }
    }
    if let Some(object) = message.as_object_mut() {
        object.insert("username".into(), json!(username));
    }
    message
}

fn cursor_field(checkpoint: &Checkpoint) -> Value {
    let cursor = checkpoint
        .cursor_id
        .as_ref()
        .map_or_else(|| "start of stream".to_string(), |c| c.to_string());
    json!({ "title": "Checkpoint", "value": cursor, "short": true })
}

/// Slack message for one finished run.
pub fn run_message(result: &RunResult) -> Value {
    match &result.status.error {
        Some(error) => json!({
            "text": "Log relay run failed",
            "attachments": [{
                "color": COLOR_FAILURE,
                "fields": [
                    { "title": "Stage", "value": error.stage, "short": true },
                    cursor_field(&result.checkpoint),
                    { "title": "Error", "value": error.message, "short": false },
                ],
            }],
        }),
        None => json!({
            "text": "Log relay run succeeded",
            "attachments": [{
                "color": COLOR_SUCCESS,
                "fields": [
                    { "title": "Logs processed", "value": result.logs_processed, "short": true },
                    cursor_field(&result.checkpoint),
                ],
            }],
        }),
    }
}

/// Slack message for a daily digest.
pub fn digest_message(report: &DigestReport) -> Value {
    let window = format!(
        "{} to {}",
        report.window_start.format("%Y-%m-%d %H:%M UTC"),
        report.window_end.format("%Y-%m-%d %H:%M UTC")
    );
    let color = if report.failed_runs > 0 {
        COLOR_FAILURE
    } else {
        COLOR_DIGEST
    };
    json!({
        "text": "Daily log relay report",
        "attachments": [{
            "color": color,
            "fields": [
                { "title": "Window", "value": window, "short": false },
                { "title": "Runs", "value": report.runs, "short": true },
                { "title": "Failed runs", "value": report.failed_runs, "short": true },
                { "title": "Logs processed", "value": report.logs_processed, "short": true },
                cursor_field(&report.checkpoint),
            ],
        }],
    })
}
