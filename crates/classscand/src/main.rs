use anyhow::{Context, Result};
use classscan_core::{EuclideanMatcher, OnnxFaceEncoder};
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod http;
mod loader;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(
        model_dir = %config.model_dir.display(),
        tolerance = config.tolerance,
        detection_threshold = config.detection_threshold,
        "classscand starting"
    );

    let matcher = EuclideanMatcher::new(config.tolerance).context("CLASSSCAN_TOLERANCE")?;

    // Fail fast if the models are not installed.
    let encoder = OnnxFaceEncoder::load(
        &config.scrfd_model_path(),
        &config.arcface_model_path(),
        config.detection_threshold,
    )
    .context("loading face models")?;

    let engine = engine::spawn_engine(encoder, matcher)?;
    let loader = loader::ImageLoader::new(config.fetch_timeout, config.max_image_bytes)?;
    let app = http::router(http::AppState::new(engine, loader), config.max_body_bytes);

    let addr = config.listen_addr().context("invalid CLASSSCAN_BIND/PORT")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "classscand ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("classscand shutting down");
    Ok(())
}
