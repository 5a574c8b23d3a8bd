use crate::state::AppState;
use axum::{extract::State, http::header, response::IntoResponse};

/// GET /metrics — Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], state.exporter.render())
}

/// GET /health — liveness probe. The cores don't have a "degraded" mode of
/// their own (queue-full and user-limit are caller-visible admission
/// outcomes, not service faults), so this is a plain liveness check.
pub async fn health() -> &'static str {
    "OK"
}
