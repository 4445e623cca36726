//! Temporal feature sequences and their fixed-length summary vectors.

use dance_models::{CoupleFrame, JointName, PoseFeatureRecord, Role};
use serde::{Deserialize, Serialize};

use crate::features::FeatureExtractor;
use crate::stats::{KeyedStats, RunningStats};

/// Length of [`TemporalFeatureSequence::summary_vector`].
pub const SUMMARY_VECTOR_LEN: usize = JointName::ALL.len() * 2 + 4 + 2;

/// Ordered per-frame features for one role over one video.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemporalFeatureSequence {
    /// Track id of the first frame the role was seen in
    pub person_id: Option<u32>,
    pub role: Option<Role>,
    pub records: Vec<PoseFeatureRecord>,
}

impl TemporalFeatureSequence {
    pub fn new(role: Role) -> Self {
        Self {
            person_id: None,
            role: Some(role),
            records: Vec::new(),
        }
    }

    /// Extract one record per frame in which `role` is present.
    ///
    /// The previous record is threaded through for velocity only while the
    /// same track appears in consecutive processed frames.
    pub fn build(extractor: &FeatureExtractor, frames: &[CoupleFrame], role: Role) -> Self {
        let mut sequence = Self::new(role);
        let mut previous: Option<(usize, PoseFeatureRecord)> = None;

        for (position, frame) in frames.iter().enumerate() {
            let Some(detection) = frame.get(role) else {
                previous = None;
                continue;
            };

            let prev = previous.as_ref().and_then(|(at, record)| {
                (*at + 1 == position && record.person_id == detection.person_id).then_some(record)
            });
            let mut record = extractor.extract(detection, prev);
            if record.frame_index.is_none() {
                record.frame_index = Some(frame.frame_index);
            }

            if sequence.person_id.is_none() {
                sequence.person_id = record.person_id;
            }
            sequence.records.push(record.clone());
            previous = Some((position, record));
        }

        sequence
    }

    pub fn frame_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every non-zero keypoint confidence in the sequence.
    pub fn valid_confidences(&self) -> impl Iterator<Item = f64> + '_ {
        self.records
            .iter()
            .flat_map(|r| r.keypoint_confidences.iter().copied())
            .filter(|c| *c != 0.0)
    }

    /// Fixed-layout summary of the whole sequence.
    ///
    /// Joint angle mean/std in [`JointName::ALL`] order, then velocity
    /// `mean_x, mean_y, std_x, std_y`, then confidence `mean, std`. Unobserved
    /// quantities are 0; the result never contains NaN or infinity.
    pub fn summary_vector(&self) -> Vec<f64> {
        let mut angles = KeyedStats::with_keys(JointName::ALL);
        let mut vel_x = RunningStats::new();
        let mut vel_y = RunningStats::new();

        for record in &self.records {
            for (joint, angle) in &record.joint_angles {
                angles.push(*joint, *angle);
            }
            if let Some(v) = record.velocity {
                vel_x.push(v.x);
                vel_y.push(v.y);
            }
        }
        let confidence: RunningStats = self.valid_confidences().collect();

        let mut vector = Vec::with_capacity(SUMMARY_VECTOR_LEN);
        for (_, mean, std) in angles.finish_or(0.0) {
            vector.push(mean);
            vector.push(std);
        }

        let (mean_x, std_x) = vel_x.finish_or(0.0);
        let (mean_y, std_y) = vel_y.finish_or(0.0);
        vector.extend([mean_x, mean_y, std_x, std_y]);

        let (conf_mean, conf_std) = confidence.finish_or(0.0);
        vector.extend([conf_mean, conf_std]);

        vector
    }
}

/// Labels matching [`TemporalFeatureSequence::summary_vector`] positions.
pub fn summary_feature_names() -> Vec<String> {
    let mut names: Vec<String> = JointName::ALL
        .iter()
        .flat_map(|joint| [format!("{joint}_mean"), format!("{joint}_std")])
        .collect();
    names.extend(
        [
            "velocity_mean_x",
            "velocity_mean_y",
            "velocity_std_x",
            "velocity_std_y",
            "confidence_mean",
            "confidence_std",
        ]
        .map(String::from),
    );
    names
}
