//! Relay configuration loaded from environment variables.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use logrelay_core::{ConfigError, LogFilter, LogId, Severity};
use logrelay_events::delivery::slack;
use logrelay_events::{DeliveryMode, DigestSchedule, DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
use logrelay_pipeline::{RunSettings, MAX_BATCH_SIZE};
use logrelay_source::TokenEndpoint;

const REQUIRED: [&str; 5] = [
    "SOURCE_DOMAIN",
    "SOURCE_CLIENT_ID",
    "SOURCE_CLIENT_SECRET",
    "WEBHOOK_URL",
    "DATABASE_URL",
];

#[derive(Clone)]
pub struct RelayConfig {
    pub source_domain: String,
    pub client_id: String,
    pub client_secret: String,
    /// Token audience; defaults to the domain's management API.
    pub audience: Option<String>,
    pub webhook_url: String,
    /// Sent verbatim as the webhook `Authorization` header.
    pub webhook_authorization: Option<String>,
    pub database_url: String,
    pub batch_size: usize,
    pub concurrent_calls: usize,
    pub send_as_batch: bool,
    pub min_level: Severity,
    pub log_types: Vec<String>,
    pub start_from: Option<LogId>,
    pub report_hour: u32,
    pub slack_webhook_url: Option<String>,
    pub slack_send_success: bool,
    pub slack_username: String,
    pub slack_title: String,
    pub http_timeout: Duration,
    pub credential_ttl: Duration,
    pub checkpoint_key: String,
    /// When set, the built-in scheduler triggers a run on this interval.
    pub run_interval: Option<Duration>,
    pub host: String,
    pub port: u16,
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                      | Default                      |
    /// |------------------------------|------------------------------|
    /// | `SOURCE_DOMAIN`              | required                     |
    /// | `SOURCE_CLIENT_ID`           | required                     |
    /// | `SOURCE_CLIENT_SECRET`       | required                     |
    /// | `WEBHOOK_URL`                | required                     |
    /// | `DATABASE_URL`               | required                     |
    /// | `SOURCE_AUDIENCE`            | `https://{domain}/api/v2/`   |
    /// | `BATCH_SIZE`                 | `100` (also the maximum)     |
    /// | `WEBHOOK_CONCURRENT_CALLS`   | `5` (clamped to `1..=100`)   |
    /// | `SEND_AS_BATCH`              | `false`                      |
    /// | `WEBHOOK_AUTHORIZATION`      | none                         |
    /// | `LOG_LEVEL`                  | `0` (debug)                  |
    /// | `LOG_TYPES`                  | all types                    |
    /// | `START_FROM`                 | start of stream              |
    /// | `DAILY_REPORT_TIME`          | `16`                         |
    /// | `SLACK_INCOMING_WEBHOOK_URL` | none (reports go to the log) |
    /// | `SLACK_SEND_SUCCESS`         | `false`                      |
    /// | `SLACK_USERNAME`             | [`slack::DEFAULT_USERNAME`]  |
    /// | `SLACK_TITLE`                | [`slack::DEFAULT_TITLE`]     |
    /// | `HTTP_TIMEOUT_SECS`          | `30`                         |
    /// | `CREDENTIAL_TTL_SECS`        | `3600`                       |
    /// | `CHECKPOINT_KEY`             | the source domain            |
    /// | `RUN_INTERVAL_SECS`          | none (HTTP trigger only)     |
    /// | `HOST`                       | `0.0.0.0`                    |
    /// | `PORT`                       | `3000`                       |
    ///
    /// Every missing required variable is listed in one
    /// [`ConfigError::Missing`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<String> = REQUIRED
            .into_iter()
            .filter(|key| get(*key).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        let required = |key: &str| get(key).unwrap_or_default();

        let source_domain = required("SOURCE_DOMAIN");

        let batch_size = get("BATCH_SIZE")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|n| *n > 0)
            .map_or(MAX_BATCH_SIZE, |n| (n as usize).min(MAX_BATCH_SIZE));

        let concurrent_calls = get("WEBHOOK_CONCURRENT_CALLS")
            .and_then(|v| v.parse::<i64>().ok())
            .map_or(DEFAULT_CONCURRENCY, |n| {
                n.clamp(1, MAX_CONCURRENCY as i64) as usize
            });

        let min_level = match get("LOG_LEVEL") {
            None => Severity::Debug,
            Some(raw) => raw
                .parse::<u8>()
                .ok()
                .and_then(Severity::from_level)
                .ok_or_else(|| invalid("LOG_LEVEL", &raw, "expected a level from 0 to 4"))?,
        };

        let log_types = get("LOG_TYPES")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect::<String>())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let report_hour = match get("DAILY_REPORT_TIME") {
            None => logrelay_events::digest::DEFAULT_REPORT_HOUR,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|h| *h < 24)
                .ok_or_else(|| invalid("DAILY_REPORT_TIME", &raw, "expected an hour from 0 to 23"))?,
        };

        let port = match get("PORT") {
            None => 3000,
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| invalid("PORT", &raw, &e.to_string()))?,
        };

        Ok(Self {
            checkpoint_key: get("CHECKPOINT_KEY").unwrap_or_else(|| source_domain.clone()),
            client_id: required("SOURCE_CLIENT_ID"),
            client_secret: required("SOURCE_CLIENT_SECRET"),
            audience: get("SOURCE_AUDIENCE"),
            webhook_url: required("WEBHOOK_URL"),
            webhook_authorization: get("WEBHOOK_AUTHORIZATION"),
            database_url: required("DATABASE_URL"),
            batch_size,
            concurrent_calls,
            send_as_batch: get("SEND_AS_BATCH").is_some_and(|v| is_true(&v)),
            min_level,
            log_types,
            start_from: get("START_FROM").and_then(LogId::new),
            report_hour,
            slack_webhook_url: get("SLACK_INCOMING_WEBHOOK_URL"),
            slack_send_success: get("SLACK_SEND_SUCCESS").is_some_and(|v| is_true(&v)),
            slack_username: get("SLACK_USERNAME")
                .unwrap_or_else(|| slack::DEFAULT_USERNAME.to_string()),
            slack_title: get("SLACK_TITLE").unwrap_or_else(|| slack::DEFAULT_TITLE.to_string()),
            http_timeout: seconds(&get, "HTTP_TIMEOUT_SECS", 30)?,
            credential_ttl: seconds(&get, "CREDENTIAL_TTL_SECS", 3600)?,
            run_interval: match get("RUN_INTERVAL_SECS") {
                None => None,
                Some(_) => Some(seconds(&get, "RUN_INTERVAL_SECS", 0)?),
            },
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            source_domain,
        })
    }

    pub fn token_endpoint(&self) -> TokenEndpoint {
        TokenEndpoint::for_domain(
            &self.source_domain,
            self.client_id.clone(),
            self.client_secret.clone(),
            self.audience.clone(),
        )
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        if self.send_as_batch {
            DeliveryMode::Batch
        } else {
            DeliveryMode::FanOut {
                concurrency: self.concurrent_calls,
            }
        }
    }

    pub fn filter(&self) -> LogFilter {
        LogFilter::new(self.min_level, self.log_types.clone())
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            batch_size: self.batch_size,
            start_from: self.start_from.clone(),
            digest: DigestSchedule::new(self.report_hour),
            notify_success: self.slack_send_success,
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e: std::net::AddrParseError| invalid("HOST", &self.host, &e.to_string()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("source_domain", &self.source_domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("webhook_url", &self.webhook_url)
            .field("batch_size", &self.batch_size)
            .field("delivery_mode", &self.delivery_mode())
            .field("min_level", &self.min_level)
            .field("log_types", &self.log_types)
            .field("report_hour", &self.report_hour)
            .field("checkpoint_key", &self.checkpoint_key)
            .field("run_interval", &self.run_interval)
            .finish_non_exhaustive()
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn is_true(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

fn seconds<G>(get: &G, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| invalid(key, &raw, "expected a positive number of seconds")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<RelayConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RelayConfig::from_lookup(|key| env.get(key).cloned())
    }

    const BASE: [(&str, &str); 5] = [
        ("SOURCE_DOMAIN", "tenant.example"),
        ("SOURCE_CLIENT_ID", "relay-client"),
        ("SOURCE_CLIENT_SECRET", "relay-secret"),
        ("WEBHOOK_URL", "https://sink.example/hook"),
        ("DATABASE_URL", "postgres://localhost/relay"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Result<RelayConfig, ConfigError> {
        let mut pairs = BASE.to_vec();
        pairs.extend_from_slice(extra);
        load(&pairs)
    }

    #[test]
    fn all_missing_settings_are_reported_together() {
        let err = load(&[("SOURCE_DOMAIN", "tenant.example"), ("WEBHOOK_URL", "  ")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(vec![
                "SOURCE_CLIENT_ID".into(),
                "SOURCE_CLIENT_SECRET".into(),
                "WEBHOOK_URL".into(),
                "DATABASE_URL".into(),
            ])
        );
    }

    #[test]
    fn defaults_apply() {
        let config = with(&[]).unwrap();

        assert_eq!(config.batch_size, 100);
        assert_eq!(config.delivery_mode(), DeliveryMode::FanOut { concurrency: 5 });
        assert_eq!(config.min_level, Severity::Debug);
        assert!(config.log_types.is_empty());
        assert_eq!(config.report_hour, 16);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.credential_ttl, Duration::from_secs(3600));
        assert_eq!(config.checkpoint_key, "tenant.example");
        assert_eq!(config.run_interval, None);
        assert_eq!(config.slack_username, "auth0-authentication-api-webhooks");
        assert_eq!(config.slack_title, "Authentication Api Webhooks");
        assert_eq!(config.bind_addr().unwrap(), "0.0.0.0:3000".parse().unwrap());
        assert!(!config.run_settings().notify_success);
    }

    #[test]
    fn batch_size_is_capped_and_sanitised() {
        assert_eq!(with(&[("BATCH_SIZE", "40")]).unwrap().batch_size, 40);
        assert_eq!(with(&[("BATCH_SIZE", "250")]).unwrap().batch_size, 100);
        assert_eq!(with(&[("BATCH_SIZE", "0")]).unwrap().batch_size, 100);
        assert_eq!(with(&[("BATCH_SIZE", "-3")]).unwrap().batch_size, 100);
        assert_eq!(with(&[("BATCH_SIZE", "lots")]).unwrap().batch_size, 100);
    }

    #[test]
    fn concurrency_has_a_floor_of_one() {
        let config = with(&[("WEBHOOK_CONCURRENT_CALLS", "0")]).unwrap();
        assert_eq!(config.delivery_mode(), DeliveryMode::FanOut { concurrency: 1 });
    }

    #[test]
    fn concurrency_is_capped() {
        let config = with(&[("WEBHOOK_CONCURRENT_CALLS", "4000000000000000000")]).unwrap();
        assert_eq!(
            config.delivery_mode(),
            DeliveryMode::FanOut {
                concurrency: MAX_CONCURRENCY
            }
        );
        let config = with(&[("WEBHOOK_CONCURRENT_CALLS", "12")]).unwrap();
        assert_eq!(config.delivery_mode(), DeliveryMode::FanOut { concurrency: 12 });
    }

    #[test]
    fn batch_mode_is_opt_in() {
        let config = with(&[("SEND_AS_BATCH", "TRUE")]).unwrap();
        assert_eq!(config.delivery_mode(), DeliveryMode::Batch);
        let config = with(&[("SEND_AS_BATCH", "yes")]).unwrap();
        assert_matches!(config.delivery_mode(), DeliveryMode::FanOut { .. });
    }

    #[test]
    fn log_types_strip_whitespace() {
        let config = with(&[("LOG_TYPES", " s, f ,,fp ")]).unwrap();
        assert_eq!(config.log_types, vec!["s", "f", "fp"]);
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let err = with(&[("LOG_LEVEL", "7")]).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { ref key, .. } if key == "LOG_LEVEL");
        assert_eq!(with(&[("LOG_LEVEL", "3")]).unwrap().min_level, Severity::Error);
    }

    #[test]
    fn invalid_report_hour_is_rejected() {
        let err = with(&[("DAILY_REPORT_TIME", "24")]).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { ref key, .. } if key == "DAILY_REPORT_TIME");
    }

    #[test]
    fn optional_settings_are_read() {
        let config = with(&[
            ("SOURCE_AUDIENCE", "urn:relay"),
            ("WEBHOOK_AUTHORIZATION", "Bearer sink-secret"),
            ("START_FROM", "900"),
            ("SLACK_INCOMING_WEBHOOK_URL", "https://hooks.slack.test/x"),
            ("SLACK_SEND_SUCCESS", "true"),
            ("SLACK_USERNAME", "relay-bot"),
            ("CHECKPOINT_KEY", "relay-a"),
            ("RUN_INTERVAL_SECS", "60"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
        ])
        .unwrap();

        assert_eq!(config.token_endpoint().audience, "urn:relay");
        assert_eq!(config.token_endpoint().token_url, "https://tenant.example/oauth/token");
        assert_eq!(config.webhook_authorization.as_deref(), Some("Bearer sink-secret"));
        assert_eq!(config.run_settings().start_from, LogId::new("900"));
        assert!(config.run_settings().notify_success);
        assert_eq!(config.slack_username, "relay-bot");
        assert_eq!(config.checkpoint_key, "relay-a");
        assert_eq!(config.run_interval, Some(Duration::from_secs(60)));
        assert_eq!(config.bind_addr().unwrap(), "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = with(&[("RUN_INTERVAL_SECS", "0")]).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { ref key, .. } if key == "RUN_INTERVAL_SECS");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", with(&[]).unwrap());
        assert!(!rendered.contains("relay-secret"));
        assert!(!rendered.contains("postgres://"));
    }
}
