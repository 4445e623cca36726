//! Blueprint assembly worker.
//!
//! Loads configuration from the environment, wires the local storage
//! backend into the video assembler and runs blueprint files through it.

pub mod config;
pub mod error;
pub mod logging;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dance_media::{check_ffmpeg_program, AssemblyStage, ProgressCallback, VideoAssembler};
use dance_storage::LocalStorage;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use tracing::{info, Instrument};

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::{init_tracing, TaskLogger};

/// Start the Prometheus exporter when `METRICS_ADDR` is configured.
pub fn install_metrics_exporter(config: &WorkerConfig) -> WorkerResult<()> {
    let Some(addr) = config.metrics_addr.as_deref() else {
        return Ok(());
    };
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| WorkerError::config_error(format!("invalid METRICS_ADDR {addr:?}: {e}")))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("failed to start metrics exporter: {e}")))?;

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Resolve the configured ffmpeg binary.
pub fn locate_ffmpeg(config: &WorkerConfig) -> WorkerResult<PathBuf> {
    Ok(check_ffmpeg_program(&config.assembler.ffmpeg_path)?)
}

/// Read a blueprint document from disk.
pub async fn load_blueprint(path: &Path) -> WorkerResult<Value> {
    let body = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| WorkerError::blueprint_file(path, e.to_string()))?;
    serde_json::from_str(&body)
        .map_err(|e| WorkerError::blueprint_file(path, format!("invalid JSON: {e}")))
}

/// Assemble one blueprint file against local storage and return the locator.
pub async fn run_blueprint_file(config: &WorkerConfig, path: &Path) -> WorkerResult<String> {
    let blueprint = load_blueprint(path).await?;
    let task_id = blueprint.get("task_id").and_then(Value::as_str);
    let logger = TaskLogger::new(task_id.unwrap_or("unknown"), "assemble");
    if task_id.is_none() {
        logger.log_warning(&format!("{} has no string task_id", path.display()));
    }

    let storage = Arc::new(LocalStorage::new(config.storage_root.clone()));
    let assembler = VideoAssembler::new(storage, config.assembler.clone());

    let progress_logger = logger.clone();
    let progress: ProgressCallback =
        Arc::new(move |stage: AssemblyStage, percent: u8, message: &str| {
            progress_logger.log_progress(&format!("[{stage}] {percent}% {message}"));
        });

    logger.log_start(&path.display().to_string());
    let span = logger.create_span();
    match assembler.assemble(&blueprint, Some(progress)).instrument(span).await {
        Ok(locator) => {
            logger.log_completion(&locator);
            Ok(locator)
        }
        Err(e) => {
            logger.log_error(&e.to_string());
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(root: &Path) -> WorkerConfig {
        let mut config = WorkerConfig {
            storage_root: root.join("storage"),
            ..Default::default()
        };
        config.assembler.work_dir = root.join("work");
        config
    }

    #[tokio::test]
    async fn test_missing_blueprint_file() {
        let root = TempDir::new().unwrap();
        let err = run_blueprint_file(&config(root.path()), &root.path().join("missing.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::BlueprintFile { .. }));
    }

    #[tokio::test]
    async fn test_invalid_json_rejected() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("bp.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_blueprint(&path).await.unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[tokio::test]
    async fn test_invalid_blueprint_reports_validating_stage() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("bp.json");
        std::fs::write(
            &path,
            r#"{"task_id": "t1", "audio_path": "song.mp3", "moves": [],
                "output_config": {"output_path": "out.mp4"}}"#,
        )
        .unwrap();

        let err = run_blueprint_file(&config(root.path()), &path).await.unwrap_err();
        match err {
            WorkerError::Assembly(e) => {
                assert_eq!(e.stage, AssemblyStage::Validating);
                assert!(e.message.contains("moves must not be empty"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_source_reports_fetching_stage() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("storage/clips")).unwrap();
        std::fs::write(root.path().join("storage/clips/a.mp4"), b"clip").unwrap();
        let path = root.path().join("bp.json");
        std::fs::write(
            &path,
            r#"{"task_id": "t2", "audio_path": "song.mp3",
                "moves": [{"video_path": "clips/a.mp4", "duration": 1.0}],
                "output_config": {"output_path": "out.mp4"}}"#,
        )
        .unwrap();

        let err = run_blueprint_file(&config(root.path()), &path).await.unwrap_err();
        match err {
            WorkerError::Assembly(e) => {
                assert_eq!(e.stage, AssemblyStage::Fetching);
                assert!(e.message.contains("song.mp3"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // Scratch directory is gone
        assert_eq!(std::fs::read_dir(root.path().join("work")).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_ffmpeg_reported() {
        let root = TempDir::new().unwrap();
        let mut config = config(root.path());
        config.assembler.ffmpeg_path = root.path().join("no-such-ffmpeg");

        let err = locate_ffmpeg(&config).unwrap_err();
        assert!(matches!(err, WorkerError::Media(dance_media::MediaError::FfmpegNotFound)));
    }

    #[test]
    fn test_metrics_exporter_skipped_without_addr() {
        assert!(install_metrics_exporter(&WorkerConfig::default()).is_ok());

        let config = WorkerConfig {
            metrics_addr: Some("not-an-addr".to_string()),
            ..Default::default()
        };
        assert!(matches!(install_metrics_exporter(&config), Err(WorkerError::ConfigError(_))));
    }
}
