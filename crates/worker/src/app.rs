//! Composition root: builds the relay from configuration.

use std::sync::Arc;

use logrelay_core::CheckpointStore;
use logrelay_events::{Deliverer, HttpWebhookSink, Reporter, SlackReporter, TracingReporter};
use logrelay_pipeline::Orchestrator;
use logrelay_source::{ClientCredentialsExchanger, CredentialCache, LogSource, ManagementApiReader};

use crate::config::RelayConfig;
use crate::relay::Relay;

/// Wire every adapter named by `config` around `store`.
///
/// The credential cache created here lives as long as the returned relay,
/// so tokens are shared across runs.
pub fn build_relay(
    config: &RelayConfig,
    store: Arc<dyn CheckpointStore>,
) -> Result<Relay, reqwest::Error> {
    let exchanger = ClientCredentialsExchanger::new(config.http_timeout)?;
    let credentials = Arc::new(CredentialCache::new(
        Arc::new(exchanger),
        config.credential_ttl,
    ));

    let client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;
    let reader = ManagementApiReader::for_domain(
        client,
        &config.source_domain,
        config.token_endpoint(),
        credentials,
    );

    let sink = HttpWebhookSink::new(
        config.webhook_url.clone(),
        config.webhook_authorization.clone(),
        config.http_timeout,
    )?;

    let reporter: Arc<dyn Reporter> = match &config.slack_webhook_url {
        Some(url) => Arc::new(
            SlackReporter::new(url.clone(), config.http_timeout)?
                .with_identity(config.slack_username.clone(), config.slack_title.clone()),
        ),
        None => Arc::new(TracingReporter),
    };

    tracing::info!(
        logs_url = reader.logs_url(),
        mode = ?config.delivery_mode(),
        slack = config.slack_webhook_url.is_some(),
        "Relay assembled"
    );

    let orchestrator = Orchestrator::new(
        LogSource::new(Arc::new(reader)),
        config.filter(),
        Deliverer::new(Arc::new(sink), config.delivery_mode()),
        store,
        reporter,
        config.run_settings(),
    );
    Ok(Relay::new(orchestrator))
}
