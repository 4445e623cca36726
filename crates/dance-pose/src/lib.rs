//! Multi-person pose tracking and temporal feature pipeline.
//!
//! This crate provides:
//! - IoU + Hungarian assignment person tracking
//! - A pose detector adapter over an injected pose-estimation primitive
//! - Lead/follow role assignment
//! - Joint-angle, centre-of-mass and velocity feature extraction
//! - Temporal sequences with NaN-safe summary vectors
//! - Extraction quality scoring and batch reporting
//! - The frame-by-frame `CoupleAnalyzer` that ties them together

pub mod analyzer;
pub mod config;
pub mod detector;
pub mod error;
pub mod features;
pub mod frames;
pub mod hungarian;
pub mod interaction;
pub mod quality;
pub mod roles;
pub mod sequence;
pub mod stats;
pub mod tracker;

pub use analyzer::{CoupleAnalysis, CoupleAnalyzer};
pub use config::{PoseConfig, TrackerConfig};
pub use detector::{PoseDetector, PoseEstimator, RawPose};
pub use error::{PoseError, PoseResult};
pub use features::FeatureExtractor;
pub use frames::{frame_skip, Frame, FrameSource, InMemoryFrames};
pub use interaction::{InteractionRecord, InteractionSequence};
pub use quality::{QualityCalculator, QualityReportGenerator};
pub use roles::assign_roles;
pub use sequence::{summary_feature_names, TemporalFeatureSequence, SUMMARY_VECTOR_LEN};
pub use tracker::PersonTracker;
