use std::path::Path;

use dance_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={} storage_root={}",
        config.assembler.work_dir.display(),
        config.storage_root.display()
    );
    ensure_workdir(&config.assembler.work_dir).await?;
    ensure_storage_root(&config.storage_root).await?;
    ensure_ffmpeg(&config)?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;
    let marker = tempfile::Builder::new()
        .prefix("selfcheck-")
        .tempfile_in(path)
        .map_err(|e| anyhow::anyhow!("work dir {} is not writable: {}", path.display(), e))?;
    drop(marker);
    Ok(())
}

async fn ensure_storage_root(path: &Path) -> anyhow::Result<()> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| anyhow::anyhow!("storage root {} unavailable: {}", path.display(), e))?;
    if !metadata.is_dir() {
        anyhow::bail!("storage root {} is not a directory", path.display());
    }
    Ok(())
}

fn ensure_ffmpeg(config: &WorkerConfig) -> anyhow::Result<()> {
    let path = dance_worker::locate_ffmpeg(config)
        .map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    println!("worker-selfcheck: ffmpeg at {}", path.display());
    Ok(())
}
