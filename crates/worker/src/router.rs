//! HTTP trigger surface.
//!
//! - `GET /health` -- liveness.
//! - `POST /` and `POST /run` -- execute one run and answer with its
//!   [`RunResult`](logrelay_core::RunResult); `409` while another run is
//!   executing.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::relay::Relay;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether a run is executing right now.
    pub running: bool,
}

#[derive(Serialize)]
struct ConflictResponse {
    error: &'static str,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        running: state.relay.is_running(),
    })
}

/// POST / and POST /run
///
/// A failed run still answers 200; the error is in `status.error`.
async fn trigger_run(State(state): State<AppState>) -> Response {
    match state.relay.try_run().await {
        Some(result) => Json(result).into_response(),
        None => {
            tracing::warn!("Run requested while another run is executing");
            (
                StatusCode::CONFLICT,
                Json(ConflictResponse {
                    error: "A relay run is already in progress",
                }),
            )
                .into_response()
        }
    }
}

/// Build the application router with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", post(trigger_run))
        .route("/run", post(trigger_run))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
