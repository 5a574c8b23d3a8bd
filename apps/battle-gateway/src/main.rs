mod config;
mod handlers;
mod routes;
mod state;

use battle_telemetry::PrometheusExporter;
use clap::Parser;
use combat_simulator::MatchRegistry;
use generation_client::MockGenerationBackend;
use generation_pipeline::GenerationPipeline;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let args = config::CliArgs::parse();
    let battle_config = config::load_battle_config(args.config.as_ref())?;

    // The external AI-image provider is an external collaborator; the
    // gateway wires the pipeline to an in-process double until a real
    // backend adapter is configured.
    let backend = Arc::new(MockGenerationBackend::new());
    let generation = Arc::new(GenerationPipeline::new(battle_config.clone(), backend));
    generation.spawn_background_tasks();

    let matches = Arc::new(MatchRegistry::new(battle_config.simulator));
    let exporter = Arc::new(PrometheusExporter::new(generation.metrics.clone()));

    let app_state = state::AppState { generation, matches, exporter, config: battle_config };
    let router = routes::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    tracing::info!(bind = %args.bind, "battle gateway listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

/// Waits for SIGINT or SIGTERM. Pairs with the invariant that in-flight
/// per-tick combat work and in-flight pipeline attempts finish before the
/// process exits: `axum::serve`'s graceful shutdown stops accepting new
/// connections and waits for in-flight requests, while background tasks
/// (workers, simulators) keep running until the process itself terminates.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
