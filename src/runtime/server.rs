//! # HTTP Server
//!
//! Liveness/readiness probes and the Prometheus metrics endpoint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::observability::metrics;

/// Shared server state for readiness reporting
pub struct ServerState {
    /// Flips true once the server has bound and the controller is serving
    pub is_ready: Arc<AtomicBool>,
}

/// Start the HTTP server for metrics and health probes.
///
/// Marks the state ready as soon as the listener is bound, so readiness
/// probes pass before the first reconcile completes.
pub async fn start_server(port: u16, state: Arc<ServerState>) -> Result<()> {
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    state.is_ready.store(true, Ordering::Relaxed);
    info!("HTTP server listening on port {port}");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<Arc<ServerState>>) -> (StatusCode, &'static str) {
    if state.is_ready.load(Ordering::Relaxed) {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn metrics_handler() -> String {
    metrics::render()
}
