//! Decoded frame sources and processing-rate sampling.

use std::collections::VecDeque;

use crate::error::PoseResult;

/// One decoded RGB frame.
pub type Frame = image::RgbImage;

/// Ordered source of decoded frames with a nominal frame rate.
pub trait FrameSource {
    /// Nominal source frame rate.
    fn fps(&self) -> f64;

    /// Next frame in presentation order, `None` at end of stream.
    ///
    /// A per-frame decode error does not end the stream.
    fn next_frame(&mut self) -> Option<PoseResult<Frame>>;
}

/// Number of source frames per processed frame.
///
/// `max(1, round(source_fps / target_fps))`; non-positive or non-finite
/// rates process every frame.
pub fn frame_skip(source_fps: f64, target_fps: f64) -> usize {
    let finite = source_fps.is_finite() && target_fps.is_finite();
    if !finite || source_fps <= 0.0 || target_fps <= 0.0 {
        return 1;
    }
    ((source_fps / target_fps).round() as usize).max(1)
}

/// Frame source backed by pre-decoded frames.
pub struct InMemoryFrames {
    fps: f64,
    frames: VecDeque<PoseResult<Frame>>,
}

impl InMemoryFrames {
    pub fn new(fps: f64, frames: Vec<Frame>) -> Self {
        Self {
            fps,
            frames: frames.into_iter().map(Ok).collect(),
        }
    }

    /// Build from per-frame decode results, preserving failures.
    pub fn from_results(fps: f64, frames: Vec<PoseResult<Frame>>) -> Self {
        Self {
            fps,
            frames: frames.into(),
        }
    }

    /// Blank frames of the given size, for driving estimators in tests.
    pub fn blank(fps: f64, count: usize, width: u32, height: u32) -> Self {
        Self::new(fps, (0..count).map(|_| Frame::new(width, height)).collect())
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for InMemoryFrames {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Option<PoseResult<Frame>> {
        self.frames.pop_front()
    }
}
