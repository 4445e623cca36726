#![deny(unreachable_patterns)]
//! Blueprint-driven video assembly over the FFmpeg CLI.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with per-invocation timeouts
//! - Progress parsing from `-progress pipe:2`
//! - Blueprint validation before any I/O
//! - The `VideoAssembler` fetch/normalize/concat/mux/upload pipeline

pub mod assembler;
pub mod blueprint;
pub mod builder;
pub mod command;
pub mod config;
pub mod error;
pub mod fs_utils;
pub mod metrics;
pub mod progress;

pub use assembler::VideoAssembler;
pub use blueprint::{parse_blueprint, validate, validation_result};
pub use command::{
    check_ffmpeg, check_ffmpeg_available, check_ffmpeg_program, FfmpegCommand, FfmpegRunner,
};
pub use config::AssemblerConfig;
pub use error::{
    AssemblyError, AssemblyResult, AssemblyStage, BlueprintValidationError, MediaError, MediaResult,
};
pub use progress::{FfmpegProgress, ProgressCallback, ProgressReporter};

#[cfg(all(test, unix))]
mod test_support;
