//! Typed assembly blueprint.
//!
//! Blueprints arrive as untyped JSON and are checked by the media crate's
//! validator before being deserialized into these types; nothing past the
//! validator handles the raw document.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default video bitrate
pub const DEFAULT_VIDEO_BITRATE: &str = "2M";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Default output frame rate
pub const DEFAULT_FRAME_RATE: u32 = 30;
/// Default transition length in seconds
pub const DEFAULT_TRANSITION_DURATION: f64 = 0.5;

/// Complete description of one rendered video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Blueprint {
    pub task_id: String,
    pub audio_path: String,
    pub moves: Vec<Move>,
    pub output_config: OutputConfig,
}

/// One clip in the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Move {
    #[serde(default)]
    pub clip_id: Option<String>,
    pub video_path: String,
    /// Position of the move in the song timeline (seconds)
    #[serde(default)]
    pub start_time: f64,
    /// Length of the move in the final render (seconds)
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub transition_type: TransitionType,
    /// Seconds to skip at the head of the source clip
    #[serde(default)]
    pub trim_start: Option<f64>,
    /// Source timestamp at which the clip ends
    #[serde(default)]
    pub trim_end: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl Move {
    /// Transition into this move, resolved against the output config.
    pub fn transition(&self, output: &OutputConfig) -> Transition {
        let duration = output.transition_duration;
        match self.transition_type {
            TransitionType::Cut => Transition::Cut,
            TransitionType::Crossfade => Transition::Crossfade { duration },
            TransitionType::FadeBlack => Transition::FadeBlack { duration },
            TransitionType::FadeWhite => Transition::FadeWhite { duration },
        }
    }

    /// Length of source material to render, if bounded.
    ///
    /// `trim_end` wins over `duration` when both are present.
    pub fn render_length(&self) -> Option<f64> {
        let start = self.trim_start.unwrap_or(0.0);
        match (self.trim_end, self.duration) {
            (Some(end), _) => Some((end - start).max(0.0)),
            (None, Some(duration)) => Some(duration),
            (None, None) => None,
        }
    }
}

/// Transition names as they appear in blueprint documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    #[default]
    Cut,
    Crossfade,
    FadeBlack,
    FadeWhite,
}

impl TransitionType {
    pub const ALL: &'static [TransitionType] = &[
        TransitionType::Cut,
        TransitionType::Crossfade,
        TransitionType::FadeBlack,
        TransitionType::FadeWhite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionType::Cut => "cut",
            TransitionType::Crossfade => "crossfade",
            TransitionType::FadeBlack => "fade_black",
            TransitionType::FadeWhite => "fade_white",
        }
    }
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown transition names.
#[derive(Debug, Error)]
#[error("Unknown transition type: {0}")]
pub struct UnknownTransition(pub String);

impl FromStr for TransitionType {
    type Err = UnknownTransition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransitionType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTransition(s.to_string()))
    }
}

/// Resolved transition with its timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Cut,
    Crossfade { duration: f64 },
    FadeBlack { duration: f64 },
    FadeWhite { duration: f64 },
}

/// Output encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutputConfig {
    /// Destination path in storage
    pub output_path: String,

    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_video_bitrate")]
    pub video_bitrate: String,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    #[serde(default = "default_transition_duration")]
    pub transition_duration: f64,

    /// Audio fade-in at the head of the render (seconds)
    #[serde(default)]
    pub fade_in_duration: Option<f64>,

    /// Audio fade-out at the tail of the render (seconds)
    #[serde(default)]
    pub fade_out_duration: Option<f64>,

    /// Linear gain applied to the audio track
    #[serde(default)]
    pub audio_volume: Option<f64>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_video_bitrate() -> String {
    DEFAULT_VIDEO_BITRATE.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_frame_rate() -> u32 {
    DEFAULT_FRAME_RATE
}
fn default_transition_duration() -> f64 {
    DEFAULT_TRANSITION_DURATION
}

impl OutputConfig {
    /// Create an output config with default encoding settings.
    pub fn new(output_path: impl Into<String>) -> Self {
        Self {
            output_path: output_path.into(),
            video_codec: default_video_codec(),
            video_bitrate: default_video_bitrate(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            frame_rate: DEFAULT_FRAME_RATE,
            transition_duration: DEFAULT_TRANSITION_DURATION,
            fade_in_duration: None,
            fade_out_duration: None,
            audio_volume: None,
        }
    }
}

impl Blueprint {
    /// Total timeline length when every move declares its duration.
    pub fn total_duration(&self) -> Option<f64> {
        self.moves.iter().map(|m| m.render_length()).sum()
    }
}
