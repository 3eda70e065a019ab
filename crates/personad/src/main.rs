use anyhow::{Context, Result};
use persona_core::Analyzer;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod extractor;
mod http;
mod normalize;
mod pipeline;
mod staging;

/// Queued scoring requests before handlers start waiting on the engine.
const ENGINE_QUEUE_DEPTH: usize = 16;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("personad starting");

    let config = config::Config::from_env()?;
    for dir in [&config.upload_dir, &config.results_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
    }
    if !config.extractor_bin.exists() {
        tracing::warn!(
            bin = %config.extractor_bin.display(),
            "extractor binary not found at configured path; relying on PATH lookup"
        );
    }

    let engine = engine::spawn_engine(Analyzer::new(config.scoring.clone()), ENGINE_QUEUE_DEPTH)?;
    let state = Arc::new(http::AppState {
        pipeline: pipeline::Pipeline::new(&config, engine),
        started_at: chrono::Utc::now(),
        seed: config.scoring.seed,
    });
    let app = http::router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "personad ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("personad shutting down");
    Ok(())
}

/// Resolves on ctrl-c. If the handler cannot be installed the server keeps
/// running rather than shutting down immediately.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
