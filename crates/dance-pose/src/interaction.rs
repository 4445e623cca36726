//! Partner interaction features for frames where both dancers are present.

use std::collections::BTreeMap;

use dance_models::{Point2, PoseFeatureRecord};
use serde::{Deserialize, Serialize};

use crate::sequence::TemporalFeatureSequence;
use crate::stats::RunningStats;

/// Spatial relation between lead and follow in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub frame_index: usize,
    /// Centre-of-mass distance in pixels
    pub distance: f64,
    /// Follow minus lead, horizontal
    pub dx: f64,
    /// Follow minus lead, vertical
    pub dy: f64,
    /// Follow velocity minus lead velocity, when both are known
    pub relative_velocity: Option<Point2>,
}

impl InteractionRecord {
    pub fn between(
        frame_index: usize,
        lead: &PoseFeatureRecord,
        follow: &PoseFeatureRecord,
    ) -> Self {
        let offset = follow.center_of_mass - lead.center_of_mass;
        let relative_velocity = match (lead.velocity, follow.velocity) {
            (Some(lv), Some(fv)) => Some(fv - lv),
            _ => None,
        };
        Self {
            frame_index,
            distance: offset.norm(),
            dx: offset.x,
            dy: offset.y,
            relative_velocity,
        }
    }
}

/// Interaction records in frame order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InteractionSequence {
    pub records: Vec<InteractionRecord>,
}

impl InteractionSequence {
    /// Pair lead and follow records that share a frame index.
    pub fn build(lead: &TemporalFeatureSequence, follow: &TemporalFeatureSequence) -> Self {
        let follow_by_frame: BTreeMap<usize, &PoseFeatureRecord> = follow
            .records
            .iter()
            .filter_map(|r| r.frame_index.map(|i| (i, r)))
            .collect();

        let records = lead
            .records
            .iter()
            .filter_map(|l| {
                let frame = l.frame_index?;
                let f = follow_by_frame.get(&frame)?;
                Some(InteractionRecord::between(frame, l, f))
            })
            .collect();

        Self { records }
    }

    pub fn frame_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `[distance_mean, distance_std, dx_mean, dx_std, dy_mean, dy_std]`,
    /// zeros when empty.
    pub fn summary_vector(&self) -> Vec<f64> {
        let distance: RunningStats = self.records.iter().map(|r| r.distance).collect();
        let dx: RunningStats = self.records.iter().map(|r| r.dx).collect();
        let dy: RunningStats = self.records.iter().map(|r| r.dy).collect();

        [distance, dx, dy]
            .iter()
            .flat_map(|s| {
                let (mean, std) = s.finish_or(0.0);
                [mean, std]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dance_models::NUM_KEYPOINTS;
    use std::collections::BTreeMap;

    fn record(frame: usize, x: f64, y: f64, velocity: Option<Point2>) -> PoseFeatureRecord {
        PoseFeatureRecord {
            frame_index: Some(frame),
            person_id: Some(0),
            joint_angles: BTreeMap::new(),
            center_of_mass: Point2::new(x, y),
            velocity,
            keypoint_positions: [[0.0; 2]; NUM_KEYPOINTS],
            keypoint_confidences: [0.8; NUM_KEYPOINTS],
        }
    }

    fn sequence(records: Vec<PoseFeatureRecord>) -> TemporalFeatureSequence {
        TemporalFeatureSequence {
            person_id: Some(0),
            role: None,
            records,
        }
    }

    #[test]
    fn test_pairs_only_shared_frames() {
        let lead = sequence(vec![
            record(0, 0.0, 0.0, None),
            record(1, 0.0, 0.0, None),
            record(2, 0.0, 0.0, None),
        ]);
        let follow = sequence(vec![record(1, 3.0, 4.0, None), record(2, 6.0, 8.0, None)]);

        let interaction = InteractionSequence::build(&lead, &follow);
        assert_eq!(interaction.frame_count(), 2);
        assert_eq!(interaction.records[0].frame_index, 1);
        assert!((interaction.records[0].distance - 5.0).abs() < 1e-12);
        assert_eq!(interaction.records[1].dx, 6.0);
    }

    #[test]
    fn test_relative_velocity() {
        let lead = record(3, 0.0, 0.0, Some(Point2::new(1.0, 1.0)));
        let follow = record(3, 10.0, 0.0, Some(Point2::new(-1.0, 2.0)));
        let r = InteractionRecord::between(3, &lead, &follow);
        assert_eq!(r.relative_velocity, Some(Point2::new(-2.0, 1.0)));

        let no_velocity = InteractionRecord::between(3, &record(3, 0.0, 0.0, None), &follow);
        assert_eq!(no_velocity.relative_velocity, None);
    }

    #[test]
    fn test_summary_vector() {
        assert_eq!(InteractionSequence::default().summary_vector(), vec![0.0; 6]);

        let lead = sequence(vec![record(0, 0.0, 0.0, None), record(1, 0.0, 0.0, None)]);
        let follow = sequence(vec![record(0, 3.0, 4.0, None), record(1, 9.0, 12.0, None)]);
        let summary = InteractionSequence::build(&lead, &follow).summary_vector();

        // distances 5 and 15
        assert!((summary[0] - 10.0).abs() < 1e-12);
        assert!((summary[1] - 5.0).abs() < 1e-12);
        assert!((summary[2] - 6.0).abs() < 1e-12);
    }
}
