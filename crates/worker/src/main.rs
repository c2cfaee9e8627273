use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use logrelay_db::PgCheckpointStore;
use logrelay_worker::{app, router, telemetry, AppState, RelayConfig, RunScheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    telemetry::init();

    // --- Configuration ---
    let config = RelayConfig::from_env()?;
    tracing::info!(?config, "Loaded relay configuration");

    // --- Database ---
    let pool = logrelay_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    logrelay_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    logrelay_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- Relay ---
    let store = Arc::new(PgCheckpointStore::new(pool, config.checkpoint_key.clone()));
    let relay = Arc::new(app::build_relay(&config, store).context("Failed to build HTTP clients")?);

    // --- Scheduler ---
    let cancel = CancellationToken::new();
    let scheduler_handle = config.run_interval.map(|interval| {
        let scheduler = RunScheduler::new(Arc::clone(&relay), interval);
        let token = cancel.clone();
        tokio::spawn(async move { scheduler.run(token).await })
    });

    // --- Server ---
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!(%addr, "Trigger surface listening");

    axum::serve(listener, router(AppState { relay }))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    cancel.cancel();
    if let Some(handle) = scheduler_handle {
        // A run in progress is allowed to finish within the HTTP timeout budget.
        let budget = config.http_timeout * 4;
        if tokio::time::timeout(budget, handle).await.is_err() {
            tracing::warn!("Scheduler did not stop in time");
        }
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
