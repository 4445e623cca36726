//! Assembly metrics.

use metrics::{counter, histogram};

use crate::error::AssemblyStage;

/// Metric names as constants for consistency.
pub mod names {
    pub const ASSEMBLIES_TOTAL: &str = "dance_assemblies_total";
    pub const ASSEMBLY_STAGE_FAILURES_TOTAL: &str = "dance_assembly_stage_failures_total";
    pub const FFMPEG_DURATION_SECONDS: &str = "dance_ffmpeg_duration_seconds";
    pub const DOWNLOAD_DURATION_SECONDS: &str = "dance_download_duration_seconds";
    pub const UPLOAD_DURATION_SECONDS: &str = "dance_upload_duration_seconds";
}

/// Record a finished assembly.
pub fn record_assembly(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(names::ASSEMBLIES_TOTAL, "status" => status).increment(1);
}

/// Record a failure attributed to one stage.
pub fn record_stage_failure(stage: AssemblyStage) {
    counter!(names::ASSEMBLY_STAGE_FAILURES_TOTAL, "stage" => stage.as_str()).increment(1);
}

/// Record one FFmpeg invocation.
pub fn record_ffmpeg_duration(stage: AssemblyStage, duration_secs: f64) {
    histogram!(names::FFMPEG_DURATION_SECONDS, "stage" => stage.as_str()).record(duration_secs);
}

/// Record the wall time of the whole fetch stage.
pub fn record_download_duration(duration_secs: f64) {
    histogram!(names::DOWNLOAD_DURATION_SECONDS).record(duration_secs);
}

pub fn record_upload_duration(duration_secs: f64) {
    histogram!(names::UPLOAD_DURATION_SECONDS).record(duration_secs);
}
