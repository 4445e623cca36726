//! Lead/follow role assignment by horizontal position.

use dance_models::PersonDetection;

/// Split one frame's tracked detections into `(lead, follow)`.
///
/// A single subject is always the lead. With two or more, the leftmost box
/// leads and the rightmost follows; anyone in between is dropped.
pub fn assign_roles(
    detections: &[PersonDetection],
) -> (Option<PersonDetection>, Option<PersonDetection>) {
    match detections {
        [] => (None, None),
        [only] => (Some(only.clone()), None),
        _ => {
            let mut by_x: Vec<&PersonDetection> = detections.iter().collect();
            by_x.sort_by(|a, b| a.bounding_box.x1.total_cmp(&b.bounding_box.x1));

            let lead = by_x.first().map(|d| (*d).clone());
            let follow = by_x.last().map(|d| (*d).clone());
            (lead, follow)
        }
    }
}
