use battle_models::BattleConfig;
use battle_telemetry::PrometheusExporter;
use combat_simulator::MatchRegistry;
use generation_pipeline::GenerationPipeline;
use std::sync::Arc;

/// Everything a route handler needs: a single `Clone`-able state struct
/// holding `Arc` handles to every service rather than threading them
/// through function arguments. Constructed once in `main` and handed to
/// `axum::Router::with_state`.
#[derive(Clone)]
pub struct AppState {
    pub generation: Arc<GenerationPipeline>,
    pub matches: Arc<MatchRegistry>,
    pub exporter: Arc<PrometheusExporter>,
    pub config: BattleConfig,
}
