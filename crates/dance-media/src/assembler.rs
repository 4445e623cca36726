//! Blueprint-driven video assembly.
//!
//! `validate → fetch → normalize → concatenate → mux → upload → cleanup`,
//! strictly in order. Every fetch finishes before normalization starts and
//! the scratch directory is removed whether or not the run succeeds.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dance_models::Blueprint;
use dance_storage::Storage;
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::blueprint::parse_blueprint;
use crate::builder::{concat_command, concat_list, mux_command, normalize_command};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::config::AssemblerConfig;
use crate::error::{AssemblyError, AssemblyResult, AssemblyStage};
use crate::fs_utils::{ensure_nonempty_file, remove_dir_if_exists, scratch_path};
use crate::metrics;
use crate::progress::{FfmpegProgress, ProgressCallback, ProgressReporter};

/// One storage object and where it lands in the scratch directory.
#[derive(Debug, Clone)]
struct FetchItem {
    key: String,
    dest: PathBuf,
}

/// Assembles final renders from blueprints.
pub struct VideoAssembler {
    storage: Arc<dyn Storage>,
    config: AssemblerConfig,
}

impl VideoAssembler {
    pub fn new(storage: Arc<dyn Storage>, config: AssemblerConfig) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Assemble one blueprint and return the storage locator of the render.
    pub async fn assemble(
        &self,
        blueprint: &Value,
        progress: Option<ProgressCallback>,
    ) -> AssemblyResult<String> {
        let reporter = ProgressReporter::new(progress);
        let started = Instant::now();

        let result = self.run(blueprint, &reporter).await;

        metrics::record_assembly(result.is_ok());
        match &result {
            Ok(locator) => {
                info!(
                    locator = %locator,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Assembly complete"
                );
                reporter.complete("Assembly complete");
            }
            Err(e) => {
                metrics::record_stage_failure(e.stage);
                error!(stage = %e.stage, error = %e.message, "Assembly failed");
            }
        }
        result
    }

    async fn run(
        &self,
        blueprint: &Value,
        reporter: &ProgressReporter,
    ) -> AssemblyResult<String> {
        reporter.report(AssemblyStage::Validating, 0.0, "Validating blueprint");
        let blueprint = parse_blueprint(blueprint)
            .map_err(|e| AssemblyError::new(AssemblyStage::Validating, e.to_string()))?;
        reporter.report(AssemblyStage::Validating, 1.0, "Blueprint valid");

        info!(
            task_id = %blueprint.task_id,
            moves = blueprint.moves.len(),
            storage = self.storage.name(),
            "Starting assembly"
        );

        // Guard removes the directory on cancellation; the explicit cleanup
        // below handles every normal exit.
        let scratch = self.create_scratch(&blueprint.task_id).await?;
        let result = self.run_stages(&blueprint, scratch.path(), reporter).await;

        reporter.report(AssemblyStage::Cleanup, 0.0, "Removing scratch files");
        if let Err(e) = remove_dir_if_exists(scratch.path()).await {
            warn!(
                task_id = %blueprint.task_id,
                path = %scratch.path().display(),
                error = %e,
                "Failed to remove scratch directory"
            );
            metrics::record_stage_failure(AssemblyStage::Cleanup);
        }
        drop(scratch);

        result
    }

    async fn create_scratch(&self, task_id: &str) -> AssemblyResult<tempfile::TempDir> {
        let work_dir = &self.config.work_dir;
        let fail = |e: std::io::Error| {
            AssemblyError::new(
                AssemblyStage::Fetching,
                format!(
                    "Failed to create scratch directory in {}: {}",
                    work_dir.display(),
                    e
                ),
            )
        };

        tokio::fs::create_dir_all(work_dir).await.map_err(fail)?;

        let prefix: String = task_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .take(64)
            .collect();
        tempfile::Builder::new()
            .prefix(&format!("{prefix}-"))
            .tempdir_in(work_dir)
            .map_err(fail)
    }

    async fn run_stages(
        &self,
        blueprint: &Blueprint,
        scratch: &Path,
        reporter: &ProgressReporter,
    ) -> AssemblyResult<String> {
        let (audio, clips) = self.fetch(blueprint, scratch, reporter).await?;
        let normalized = self.normalize(blueprint, &clips, scratch, reporter).await?;
        let concatenated = self.concatenate(&normalized, scratch, reporter).await?;
        let final_video = self.mux(blueprint, &concatenated, &audio, scratch, reporter).await?;
        self.upload(blueprint, &final_video, reporter).await
    }

    /// Download the song and every clip, then verify each is non-empty.
    async fn fetch(
        &self,
        blueprint: &Blueprint,
        scratch: &Path,
        reporter: &ProgressReporter,
    ) -> AssemblyResult<(PathBuf, Vec<PathBuf>)> {
        reporter.report(AssemblyStage::Fetching, 0.0, "Downloading media");
        let started = Instant::now();

        let audio = FetchItem {
            key: blueprint.audio_path.clone(),
            dest: scratch_path(scratch, "audio", &blueprint.audio_path, "mp3"),
        };
        let clips: Vec<FetchItem> = blueprint
            .moves
            .iter()
            .enumerate()
            .map(|(i, mv)| FetchItem {
                key: mv.video_path.clone(),
                dest: scratch_path(scratch, &format!("clip_{i:03}"), &mv.video_path, "mp4"),
            })
            .collect();

        let items: Vec<&FetchItem> = std::iter::once(&audio).chain(clips.iter()).collect();
        let total = items.len();
        let done = AtomicUsize::new(0);
        let semaphore = Semaphore::new(self.config.max_parallel_downloads.max(1));

        let futures: Vec<_> = items
            .iter()
            .map(|item| {
                let semaphore = &semaphore;
                let done = &done;
                async move {
                    let _permit = semaphore.acquire().await.map_err(|e| {
                        AssemblyError::new(
                            AssemblyStage::Fetching,
                            format!("Download slot unavailable: {e}"),
                        )
                    })?;
                    self.fetch_one(item).await?;

                    let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                    reporter.report(
                        AssemblyStage::Fetching,
                        finished as f64 / total as f64,
                        &format!("Downloaded {}/{}", finished, total),
                    );
                    Ok::<(), AssemblyError>(())
                }
            })
            .collect();

        for result in join_all(futures).await {
            result?;
        }

        metrics::record_download_duration(started.elapsed().as_secs_f64());
        debug!(files = total, "All media fetched");

        Ok((audio.dest, clips.into_iter().map(|c| c.dest).collect()))
    }

    async fn fetch_one(&self, item: &FetchItem) -> AssemblyResult<()> {
        self.storage
            .download(&item.key, &item.dest)
            .await
            .map_err(|e| {
                AssemblyError::new(
                    AssemblyStage::Fetching,
                    format!("Failed to download {}: {}", item.key, e),
                )
            })?;

        let size = ensure_nonempty_file(&item.dest).await.map_err(|e| {
            AssemblyError::new(
                AssemblyStage::Fetching,
                format!("Downloaded file for {} is unusable: {}", item.key, e),
            )
        })?;
        debug!(key = %item.key, bytes = size, "Fetched");
        Ok(())
    }

    /// Re-encode each clip to the target frame rate; any failure aborts.
    async fn normalize(
        &self,
        blueprint: &Blueprint,
        clips: &[PathBuf],
        scratch: &Path,
        reporter: &ProgressReporter,
    ) -> AssemblyResult<Vec<PathBuf>> {
        let runner = self.runner(self.config.normalize_timeout());
        let total = clips.len();
        let mut normalized = Vec::with_capacity(total);

        for (i, (clip, mv)) in clips.iter().zip(&blueprint.moves).enumerate() {
            reporter.report(
                AssemblyStage::Normalizing,
                i as f64 / total as f64,
                &format!("Normalizing clip {}/{}", i + 1, total),
            );

            let output = scratch.join(format!("norm_{i:03}.mp4"));
            let cmd = normalize_command(clip, &output, mv, &blueprint.output_config, &self.config);
            self.run_timed(AssemblyStage::Normalizing, &runner, &cmd, |_| {})
                .await
                .map_err(|e| e.with_context(format!("clip {} ({})", i, mv.video_path)))?;

            normalized.push(output);
        }

        reporter.report(AssemblyStage::Normalizing, 1.0, "Clips normalized");
        Ok(normalized)
    }

    /// Stream-copy concatenation of the normalized clips.
    async fn concatenate(
        &self,
        clips: &[PathBuf],
        scratch: &Path,
        reporter: &ProgressReporter,
    ) -> AssemblyResult<PathBuf> {
        reporter.report(AssemblyStage::Concatenating, 0.0, "Concatenating clips");

        let stage_error = |what: &str, e: std::io::Error| {
            AssemblyError::new(AssemblyStage::Concatenating, format!("{what}: {e}"))
        };

        let absolute: Vec<PathBuf> = clips
            .iter()
            .map(std::path::absolute)
            .collect::<Result<_, _>>()
            .map_err(|e| stage_error("Failed to resolve clip path", e))?;

        let list_file = scratch.join("concat.txt");
        tokio::fs::write(&list_file, concat_list(&absolute))
            .await
            .map_err(|e| stage_error("Failed to write concat list", e))?;

        let output = scratch.join("concat.mp4");
        let cmd = concat_command(&list_file, &output);
        let runner = self.runner(self.config.concat_timeout());
        self.run_timed(AssemblyStage::Concatenating, &runner, &cmd, |_| {})
            .await?;

        reporter.report(AssemblyStage::Concatenating, 1.0, "Clips concatenated");
        Ok(output)
    }

    /// Mux the concatenated video with the song.
    async fn mux(
        &self,
        blueprint: &Blueprint,
        video: &Path,
        audio: &Path,
        scratch: &Path,
        reporter: &ProgressReporter,
    ) -> AssemblyResult<PathBuf> {
        reporter.report(AssemblyStage::Muxing, 0.0, "Adding audio");

        let timeline = blueprint.total_duration();
        if timeline.is_none() && blueprint.output_config.fade_out_duration.is_some() {
            warn!(task_id = %blueprint.task_id, "Timeline length unknown, skipping audio fade-out");
        }

        let output = scratch.join("final.mp4");
        let cmd = mux_command(video, audio, &output, &blueprint.output_config, timeline);

        let total_ms = timeline.map(|t| (t * 1000.0) as i64);
        let progress = reporter.clone();
        let runner = self.runner(self.config.mux_timeout());
        self.run_timed(AssemblyStage::Muxing, &runner, &cmd, move |p: FfmpegProgress| {
            if let Some(total_ms) = total_ms {
                progress.report(AssemblyStage::Muxing, p.fraction(total_ms), "Adding audio");
            }
        })
        .await?;

        reporter.report(AssemblyStage::Muxing, 1.0, "Audio added");
        Ok(output)
    }

    async fn upload(
        &self,
        blueprint: &Blueprint,
        final_video: &Path,
        reporter: &ProgressReporter,
    ) -> AssemblyResult<String> {
        reporter.report(AssemblyStage::Uploading, 0.0, "Uploading render");
        let started = Instant::now();
        let key = &blueprint.output_config.output_path;

        let locator = self.storage.upload(final_video, key).await.map_err(|e| {
            AssemblyError::new(
                AssemblyStage::Uploading,
                format!("Failed to upload {}: {}", key, e),
            )
        })?;

        metrics::record_upload_duration(started.elapsed().as_secs_f64());
        reporter.report(AssemblyStage::Uploading, 1.0, "Render uploaded");
        Ok(locator)
    }

    fn runner(&self, timeout: Duration) -> FfmpegRunner {
        FfmpegRunner::new()
            .with_program(&self.config.ffmpeg_path)
            .with_timeout(timeout)
            .with_output_limit(self.config.tool_output_limit)
    }

    async fn run_timed<F>(
        &self,
        stage: AssemblyStage,
        runner: &FfmpegRunner,
        cmd: &FfmpegCommand,
        on_progress: F,
    ) -> AssemblyResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        let started = Instant::now();
        let result = runner.run_with_progress(cmd, on_progress).await;
        metrics::record_ffmpeg_duration(stage, started.elapsed().as_secs_f64());

        result.map_err(|e| AssemblyError::from_media(stage, e, self.config.tool_output_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dance_storage::{MockStorage, StorageError};
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn blueprint() -> Value {
        json!({
            "task_id": "task-42",
            "audio_path": "audio/song.mp3",
            "moves": [
                {"video_path": "clips/a.mp4", "start_time": 0.0, "duration": 2.0},
                {"video_path": "clips/b.mp4", "start_time": 2.0, "duration": 2.0}
            ],
            "output_config": {"output_path": "renders/task-42.mp4"}
        })
    }

    fn config(work_dir: &Path) -> AssemblerConfig {
        AssemblerConfig {
            work_dir: work_dir.to_path_buf(),
            ..Default::default()
        }
    }

    fn mock_storage() -> MockStorage {
        let mut storage = MockStorage::new();
        storage.expect_name().return_const("mock");
        storage
    }

    fn scratch_entries(work_dir: &Path) -> usize {
        std::fs::read_dir(work_dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_invalid_blueprint_fails_before_io() {
        let root = TempDir::new().unwrap();
        let work_dir = root.path().join("work");
        let mut storage = mock_storage();
        storage.expect_download().never();
        storage.expect_upload().never();

        let assembler = VideoAssembler::new(Arc::new(storage), config(&work_dir));
        let mut bp = blueprint();
        bp["moves"][0]["video_path"] = json!("../../etc/passwd");

        let err = assembler.assemble(&bp, None).await.unwrap_err();
        assert_eq!(err.stage, AssemblyStage::Validating);
        assert!(err.to_string().starts_with("[validating]"));
        assert!(err.message.contains("path traversal"));
        assert!(!work_dir.exists());
    }

    #[tokio::test]
    async fn test_missing_clip_names_path_and_cleans_up() {
        let root = TempDir::new().unwrap();
        let mut storage = mock_storage();
        storage.expect_download().returning(|key, dest| {
            if key == "clips/b.mp4" {
                return Err(StorageError::not_found(key));
            }
            std::fs::write(dest, b"media")?;
            Ok(())
        });
        storage.expect_upload().never();

        let assembler = VideoAssembler::new(Arc::new(storage), config(root.path()));
        let err = assembler.assemble(&blueprint(), None).await.unwrap_err();

        assert_eq!(err.stage, AssemblyStage::Fetching);
        assert!(err.message.contains("clips/b.mp4"));
        assert_eq!(scratch_entries(root.path()), 0);
    }

    #[tokio::test]
    async fn test_empty_download_rejected() {
        let root = TempDir::new().unwrap();
        let mut storage = mock_storage();
        storage.expect_download().returning(|key, dest| {
            let body: &[u8] = if key == "audio/song.mp3" { b"" } else { b"media" };
            std::fs::write(dest, body)?;
            Ok(())
        });

        let assembler = VideoAssembler::new(Arc::new(storage), config(root.path()));
        let err = assembler.assemble(&blueprint(), None).await.unwrap_err();

        assert_eq!(err.stage, AssemblyStage::Fetching);
        assert!(err.message.contains("audio/song.mp3"));
        assert!(err.message.contains("empty"));
        assert_eq!(scratch_entries(root.path()), 0);
    }

    #[tokio::test]
    async fn test_progress_starts_in_validating_band() {
        let root = TempDir::new().unwrap();
        let mut storage = mock_storage();
        storage
            .expect_download()
            .returning(|key, _| Err(StorageError::not_found(key)));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressCallback =
            Arc::new(move |stage: AssemblyStage, pct: u8, _msg: &str| {
                sink.lock().unwrap().push((stage, pct));
            });

        let assembler = VideoAssembler::new(Arc::new(storage), config(root.path()));
        assembler.assemble(&blueprint(), Some(callback)).await.unwrap_err();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&(AssemblyStage::Validating, 0)));
        assert!(seen.contains(&(AssemblyStage::Fetching, 5)));
        assert!(seen.iter().all(|(_, pct)| *pct < 100));
        assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[cfg(unix)]
    mod stages {
        use super::*;
        use crate::test_support::{fake_ffmpeg, Fault, FAULT_MESSAGE, OUTPUT_BODY};

        fn fetching_storage() -> MockStorage {
            let mut storage = mock_storage();
            storage.expect_download().returning(|_, dest| {
                std::fs::write(dest, OUTPUT_BODY)?;
                Ok(())
            });
            storage
        }

        fn assembler(root: &Path, fault: Fault, storage: MockStorage) -> VideoAssembler {
            let config = AssemblerConfig {
                ffmpeg_path: fake_ffmpeg(root, fault),
                normalize_timeout_secs: 1,
                ..config(&root.join("work"))
            };
            VideoAssembler::new(Arc::new(storage), config)
        }

        async fn failing_stage(fault: Fault) -> (AssemblyError, usize) {
            let root = TempDir::new().unwrap();
            let mut storage = fetching_storage();
            storage.expect_upload().never();

            let err = assembler(root.path(), fault, storage)
                .assemble(&blueprint(), None)
                .await
                .unwrap_err();
            (err, scratch_entries(&root.path().join("work")))
        }

        #[tokio::test]
        async fn test_full_run_uploads_final_render() {
            let root = TempDir::new().unwrap();
            let mut storage = fetching_storage();
            storage
                .expect_upload()
                .times(1)
                .returning(|local, key| {
                    assert_eq!(std::fs::read(local)?, OUTPUT_BODY);
                    assert!(local.ends_with("final.mp4"));
                    Ok(format!("mock://{key}"))
                });

            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = seen.clone();
            let callback: ProgressCallback =
                Arc::new(move |stage: AssemblyStage, pct: u8, _msg: &str| {
                    sink.lock().unwrap().push((stage, pct));
                });

            let locator = assembler(root.path(), Fault::None, storage)
                .assemble(&blueprint(), Some(callback))
                .await
                .unwrap();

            assert_eq!(locator, "mock://renders/task-42.mp4");
            assert_eq!(scratch_entries(&root.path().join("work")), 0);

            let seen = seen.lock().unwrap();
            assert!(seen.iter().any(|(stage, _)| *stage == AssemblyStage::Muxing));
            assert_eq!(seen.last().map(|(_, pct)| *pct), Some(100));
            assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1));
        }

        #[tokio::test]
        async fn test_normalize_failure_names_clip() {
            let (err, leftovers) = failing_stage(Fault::Exit("normalize")).await;

            assert_eq!(err.stage, AssemblyStage::Normalizing);
            assert!(err.message.starts_with("clip 0 (clips/a.mp4)"));
            let output = err.tool_output.as_deref().unwrap_or_default();
            assert!(output.contains(FAULT_MESSAGE));
            assert_eq!(leftovers, 0);
        }

        #[tokio::test]
        async fn test_concat_failure() {
            let (err, leftovers) = failing_stage(Fault::Exit("concat")).await;

            assert_eq!(err.stage, AssemblyStage::Concatenating);
            assert!(err.to_string().starts_with("[concatenating]"));
            assert!(err.tool_output.is_some_and(|out| out.contains("concat:")));
            assert_eq!(leftovers, 0);
        }

        #[tokio::test]
        async fn test_mux_failure() {
            let (err, leftovers) = failing_stage(Fault::Exit("mux")).await;

            assert_eq!(err.stage, AssemblyStage::Muxing);
            assert!(err.tool_output.is_some_and(|out| out.contains("mux:")));
            assert_eq!(leftovers, 0);
        }

        #[tokio::test]
        async fn test_normalize_timeout_keeps_tool_output() {
            let (err, leftovers) = failing_stage(Fault::Hang("normalize")).await;

            assert_eq!(err.stage, AssemblyStage::Normalizing);
            assert!(err.message.contains("timed out after 1 seconds"));
            assert!(err.tool_output.is_some_and(|out| out.contains(FAULT_MESSAGE)));
            assert_eq!(leftovers, 0);
        }

        #[tokio::test]
        async fn test_upload_failure_names_key() {
            let root = TempDir::new().unwrap();
            let mut storage = fetching_storage();
            storage
                .expect_upload()
                .returning(|_, _| Err(StorageError::upload_failed("bucket unavailable")));

            let err = assembler(root.path(), Fault::None, storage)
                .assemble(&blueprint(), None)
                .await
                .unwrap_err();

            assert_eq!(err.stage, AssemblyStage::Uploading);
            assert!(err.message.contains("renders/task-42.mp4"));
            assert!(err.message.contains("bucket unavailable"));
            assert_eq!(scratch_entries(&root.path().join("work")), 0);
        }
    }
}
