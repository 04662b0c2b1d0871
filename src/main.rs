use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use webcam_recorder::{create_router, AppState, CommandEncoder, Config, IngestionHandler};

#[derive(Debug, Parser)]
#[command(name = "webcam-recorder", about = "Webcam recording upload service")]
struct Args {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/webcam-recorder")]
    config: String,

    /// Start even if the encoder binary cannot be run
    #[arg(long)]
    skip_encoder_check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Webcam Recorder v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let encoder = CommandEncoder::new(cfg.encoder.program.clone(), cfg.encoder_profile());
    match encoder.probe().await {
        Ok(version) => info!("Encoder available: {}", version),
        Err(e) if args.skip_encoder_check => warn!("{}; continuing anyway", e),
        Err(e) => return Err(e.context("Recording uploads need a working encoder")),
    }

    let layout = cfg.storage_layout();
    info!("Temporary uploads: {}", layout.uploads_dir().display());

    let state = AppState::new(IngestionHandler::new(layout, Arc::new(encoder)));
    let app = create_router(state, cfg.service.http.max_upload_bytes);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
