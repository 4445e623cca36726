//! FFmpeg invocations for each assembly stage.

use std::path::{Path, PathBuf};

use dance_models::{Move, OutputConfig, Transition};

use crate::command::FfmpegCommand;
use crate::config::AssemblerConfig;

/// Re-encode one clip to the canonical frame rate without audio.
///
/// `trim_start` seeks into the source; the render length (see
/// [`Move::render_length`]) bounds the output. Non-cut transitions become a
/// fade-in at the head of the clip.
pub fn normalize_command(
    input: &Path,
    output: &Path,
    mv: &Move,
    output_config: &OutputConfig,
    config: &AssemblerConfig,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(output);

    if let Some(start) = mv.trim_start.filter(|s| *s > 0.0) {
        cmd = cmd.seek(start);
    }
    if let Some(length) = mv.render_length().filter(|l| *l > 0.0) {
        cmd = cmd.duration(length);
    }
    cmd = cmd.input(input);

    if let Some(filter) = transition_filter(mv.transition(output_config), mv.render_length()) {
        cmd = cmd.video_filter(filter);
    }

    cmd.video_codec("libx264")
        .preset(config.normalize_preset.clone())
        .frame_rate(config.target_fps)
        .output_args(["-pix_fmt", "yuv420p"])
        .no_audio()
}

/// Fade-in filter for a transition into a clip.
///
/// Stream-copy concatenation cannot blend neighbouring clips, so a
/// crossfade renders as a fade from black.
pub fn transition_filter(transition: Transition, clip_length: Option<f64>) -> Option<String> {
    let (duration, color) = match transition {
        Transition::Cut => return None,
        Transition::Crossfade { duration } | Transition::FadeBlack { duration } => {
            (duration, "black")
        }
        Transition::FadeWhite { duration } => (duration, "white"),
    };

    let duration = match clip_length {
        Some(length) if length > 0.0 => duration.min(length),
        _ => duration,
    };
    if duration <= 0.0 {
        return None;
    }
    Some(format!("fade=t=in:st=0:d={duration:.3}:color={color}"))
}

/// Contents of a concat-demuxer list file: one absolute path per line.
pub fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', r"'\''")))
        .collect()
}

/// Concatenate normalized clips by stream copy.
pub fn concat_command(list_file: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .format("concat")
        .input_arg("-safe")
        .input_arg("0")
        .input(list_file)
        .stream_copy()
}

/// Combine the concatenated video with the song.
///
/// The output stops at the shorter stream. A fade-out needs the timeline
/// length and is skipped without it.
pub fn mux_command(
    video: &Path,
    audio: &Path,
    output: &Path,
    output_config: &OutputConfig,
    timeline_length: Option<f64>,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(output)
        .input(video)
        .input(audio)
        .map("0:v:0")
        .map("1:a:0")
        .video_codec(output_config.video_codec.clone())
        .video_bitrate(output_config.video_bitrate.clone())
        .audio_codec(output_config.audio_codec.clone())
        .audio_bitrate(output_config.audio_bitrate.clone());

    if let Some(filter) = audio_filter(output_config, timeline_length) {
        cmd = cmd.audio_filter(filter);
    }

    cmd.output_arg("-shortest").output_args(["-movflags", "+faststart"])
}

/// Volume and fade chain for the audio track.
pub fn audio_filter(output_config: &OutputConfig, timeline_length: Option<f64>) -> Option<String> {
    let mut filters = Vec::new();

    if let Some(volume) = output_config.audio_volume.filter(|v| (*v - 1.0).abs() > f64::EPSILON) {
        filters.push(format!("volume={volume:.3}"));
    }
    if let Some(fade_in) = output_config.fade_in_duration.filter(|d| *d > 0.0) {
        filters.push(format!("afade=t=in:st=0:d={fade_in:.3}"));
    }
    if let (Some(fade_out), Some(total)) = (
        output_config.fade_out_duration.filter(|d| *d > 0.0),
        timeline_length.filter(|t| *t > 0.0),
    ) {
        let fade_out = fade_out.min(total);
        filters.push(format!("afade=t=out:st={:.3}:d={fade_out:.3}", total - fade_out));
    }

    (!filters.is_empty()).then(|| filters.join(","))
}
