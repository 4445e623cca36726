//! Shared data models for the dance analysis pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Bounding boxes and COCO keypoints
//! - Per-frame person detections and lead/follow couple frames
//! - Per-frame kinematic feature records
//! - Quality reports
//! - Assembly blueprints (clip list, transitions, output encoding)

pub mod blueprint;
pub mod detection;
pub mod features;
pub mod geometry;
pub mod quality;

// Re-export common types
pub use blueprint::{Blueprint, Move, OutputConfig, Transition, TransitionType};
pub use detection::{CoupleFrame, PersonDetection, Role};
pub use features::{JointName, PoseFeatureRecord};
pub use geometry::{BoundingBox, CocoKeypoint, Keypoint, Point2, NUM_KEYPOINTS};
pub use quality::{QualityReport, QualityThresholds};
