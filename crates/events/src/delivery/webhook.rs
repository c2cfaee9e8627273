//! Webhook sink: one HTTP POST per delivery call.
//!
//! [`HttpWebhookSink`] posts a JSON payload (a single log record or an array
//! of them) to the configured URL. A call succeeds iff the transport
//! succeeds and the answer is in the `[200, 400)` band. Redirects are not
//! followed, so a 3xx answer is judged on its own status.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use logrelay_core::DeliveryError;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;

/// HTTP request timeout for a single delivery call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Receives delivery payloads. Implemented over HTTP by [`HttpWebhookSink`].
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn send(&self, payload: &serde_json::Value) -> Result<(), DeliveryError>;
}

/// Whether a sink answer counts as a successful delivery.
pub fn is_accepted(status: StatusCode) -> bool {
    (200..400).contains(&status.as_u16())
}

// ---------------------------------------------------------------------------
// HttpWebhookSink
// ---------------------------------------------------------------------------

pub struct HttpWebhookSink {
    client: reqwest::Client,
    url: String,
    authorization: Option<String>,
}

impl HttpWebhookSink {
    /// Builds a sink for `url`. `authorization` is sent verbatim as the
    /// `Authorization` header on every call.
    pub fn new(
        url: impl Into<String>,
        authorization: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            authorization,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl WebhookSink for HttpWebhookSink {
    async fn send(&self, payload: &serde_json::Value) -> Result<(), DeliveryError> {
        let mut request = self.client.post(&self.url).json(payload);
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        let started = Instant::now();
        let response = request.send().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %self.url, elapsed_ms, error = %e, "Webhook call failed");
                return Err(DeliveryError::Request {
                    url: self.url.clone(),
                    source: Box::new(e),
                });
            }
        };

        let status = response.status();
        tracing::debug!(url = %self.url, status = status.as_u16(), elapsed_ms, "Webhook call finished");

        if !is_accepted(status) {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_band_is_200_to_399() {
        assert!(!is_accepted(StatusCode::SWITCHING_PROTOCOLS));
        assert!(is_accepted(StatusCode::OK));
        assert!(is_accepted(StatusCode::NO_CONTENT));
        assert!(is_accepted(StatusCode::FOUND));
        assert!(is_accepted(StatusCode::PERMANENT_REDIRECT));
        assert!(!is_accepted(StatusCode::BAD_REQUEST));
        assert!(!is_accepted(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_accepted(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_accepted(StatusCode::GATEWAY_TIMEOUT));
    }

    #[test]
    fn new_does_not_panic() {
        let sink = HttpWebhookSink::new("http://sink.test/hook", None, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(sink.url(), "http://sink.test/hook");
    }
}
