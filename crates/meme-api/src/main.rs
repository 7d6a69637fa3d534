//! Meme API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meme_api::{create_router, metrics, ApiConfig, AppState};
use meme_media::{check_ffmpeg, check_ffprobe, check_ytdlp};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing()?;

    info!("Starting meme-api");

    let config = ApiConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        environment = %config.environment,
        "API config loaded"
    );

    let state = AppState::from_env(config.clone());
    let generator_config = state.generator.config();
    info!(
        temp_audio_dir = %generator_config.temp_audio_dir.display(),
        background_video = %generator_config.background_video_path.display(),
        output = %generator_config.output_path.display(),
        pool_size = generator_config.fetch.pool_size,
        max_attempts = generator_config.fetch.max_attempts,
        "Generator config loaded"
    );

    // Missing tools only fail individual jobs; /ready reports them
    for check in [check_ffmpeg(), check_ffprobe(), check_ytdlp()] {
        match check {
            Ok(path) => info!("Found {}", path.display()),
            Err(e) => warn!("{}", e),
        }
    }
    if !generator_config.background_video_path.is_file() {
        warn!(
            "Background video {} not found",
            generator_config.background_video_path.display()
        );
    }

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("Failed to install Prometheus recorder")?)
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address()))?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Colored text by default, JSON when `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("meme=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
