use crate::handlers::{combat, metrics, progress, submission};
use crate::state::AppState;
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the full HTTP/WS surface over the two cores. Routing, CORS, and
/// tracing middleware are the only things this crate owns; everything
/// underneath is the generation pipeline and combat simulator crates.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(metrics::health))
        .route("/metrics", get(metrics::metrics))
        .route("/api/v1/generate", post(submission::submit))
        .route("/api/v1/jobs/:job_id/stream", get(progress::stream_progress))
        .route("/api/v1/matches", post(combat::create_match))
        .route("/api/v1/matches/:match_id/stream", get(combat::stream_match))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
