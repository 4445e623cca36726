//! Blueprint assembly worker binary.
//!
//! Usage: `dance-worker <blueprint.json>`

use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::info;

use dance_worker::{
    init_tracing, install_metrics_exporter, locate_ffmpeg, run_blueprint_file, WorkerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env();
    init_tracing(config.log_json)?;

    let Some(blueprint_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: dance-worker <blueprint.json>");
    };

    info!("Starting dance-worker");
    info!("Worker config: {:?}", config);

    install_metrics_exporter(&config)?;

    let ffmpeg = locate_ffmpeg(&config).context("ffmpeg is required for assembly")?;
    info!(ffmpeg = %ffmpeg.display(), "FFmpeg found");

    let locator = run_blueprint_file(&config, &blueprint_path)
        .await
        .with_context(|| format!("assembly of {} failed", blueprint_path.display()))?;

    println!("{locator}");
    Ok(())
}
