//! Gap Detection
//!
//! Finds openings between pairs of blocked sensors with clear sensors in
//! between and decides whether the robot body fits through.

use super::sensor_frame::SensorFrame;
use crate::messages::{wrap_angle, SENSOR_COUNT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapConfig {
    /// Normalized reading at which a sensor bounds a gap
    pub blocked_threshold: f64,
    /// Sensors between the bounds must read below this
    pub clear_threshold: f64,
    /// Maximum index distance between the two bounding sensors
    pub max_span: usize,
    /// Extra width beyond the robot diameter for a gap to be navigable
    pub margin: f64,
    /// Force multiplier for sensors bounding a navigable gap
    pub repulsion_scale: f64,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            blocked_threshold: 100.0,
            clear_threshold: 60.0,
            max_span: 3,
            margin: 25.0,
            repulsion_scale: 0.3,
        }
    }
}

/// Opening between two blocked sensors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gap {
    /// Lower sensor index (left of the pair)
    pub left: usize,
    /// Higher sensor index (right of the pair)
    pub right: usize,
    /// Separation of the two obstacle points (cm)
    pub width: f64,
    /// World-frame bearing of the gap centre line
    pub bearing: f64,
    pub navigable: bool,
}

impl Gap {
    pub fn bounds(&self, index: usize) -> bool {
        self.left == index || self.right == index
    }
}

/// Robot-frame point for a reading, x lateral and y forward
fn lateral_point(distance: f64, bearing: f64) -> (f64, f64) {
    (distance * bearing.sin(), distance * bearing.cos())
}

/// Scan the frame for gaps
///
/// Each blocked sensor pairs with at most one partner, the first blocked
/// sensor within `max_span` whose in-between sensors are all clear.
pub fn detect_gaps(
    frame: &SensorFrame,
    config: &GapConfig,
    robot_diameter: f64,
    heading: f64,
) -> Vec<Gap> {
    let readings = frame.readings();
    let blocked = |i: usize| readings[i].normalized >= config.blocked_threshold;
    let mut gaps = Vec::new();

    for i in 0..SENSOR_COUNT {
        if !blocked(i) {
            continue;
        }
        let last = (i + config.max_span).min(SENSOR_COUNT - 1);
        for j in (i + 1)..=last {
            if !blocked(j) {
                continue;
            }
            let between_clear = ((i + 1)..j).all(|k| readings[k].normalized < config.clear_threshold);
            if !between_clear {
                continue;
            }

            let (a, b) = (&readings[i], &readings[j]);
            let (ax, ay) = lateral_point(a.distance, a.bearing);
            let (bx, by) = lateral_point(b.distance, b.bearing);
            let width = (ax - bx).hypot(ay - by);

            gaps.push(Gap {
                left: i,
                right: j,
                width,
                bearing: wrap_angle(heading + (a.bearing + b.bearing) / 2.0),
                navigable: width >= robot_diameter + config.margin,
            });
            break;
        }
    }
    gaps
}

/// Widest navigable gap, if any
pub fn widest_navigable(gaps: &[Gap]) -> Option<&Gap> {
    gaps.iter()
        .filter(|g| g.navigable)
        .max_by(|a, b| a.width.total_cmp(&b.width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::sensor_frame::{ProximityThresholds, SensorCalibration};
    use approx::assert_relative_eq;

    fn frame_from_normalized(normalized: [f64; SENSOR_COUNT]) -> SensorFrame {
        let cal = SensorCalibration::default();
        let raw = std::array::from_fn(|i| normalized[i] * cal.factors[i]);
        SensorFrame::build(&cal, &ProximityThresholds::default(), &raw)
    }

    #[test]
    fn test_no_gap_without_blocked_pair() {
        let frame = frame_from_normalized([150.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(detect_gaps(&frame, &GapConfig::default(), 34.0, 0.0).is_empty());
    }

    #[test]
    fn test_gap_between_blocked_sensors() {
        let frame = frame_from_normalized([0.0, 0.0, 150.0, 10.0, 150.0, 0.0, 0.0]);
        let config = GapConfig {
            margin: 5.0,
            ..GapConfig::default()
        };
        let gaps = detect_gaps(&frame, &config, 4.0, 0.0);
        assert_eq!(gaps.len(), 1);

        let gap = gaps[0];
        assert_eq!((gap.left, gap.right), (2, 4));
        assert!(gap.bounds(2) && gap.bounds(4) && !gap.bounds(3));

        let r2 = frame.reading(2);
        let r4 = frame.reading(4);
        let (ax, ay) = lateral_point(r2.distance, r2.bearing);
        let (bx, by) = lateral_point(r4.distance, r4.bearing);
        assert_relative_eq!(gap.width, (ax - bx).hypot(ay - by), epsilon = 1e-9);
        assert_relative_eq!(gap.bearing, (r2.bearing + r4.bearing) / 2.0, epsilon = 1e-12);
        assert!(gap.navigable);
        assert_eq!(widest_navigable(&gaps), Some(&gap));
    }

    #[test]
    fn test_gap_too_narrow_for_robot() {
        let frame = frame_from_normalized([0.0, 0.0, 150.0, 10.0, 150.0, 0.0, 0.0]);
        let gaps = detect_gaps(&frame, &GapConfig::default(), 34.19, 0.0);
        assert_eq!(gaps.len(), 1);
        assert!(!gaps[0].navigable);
        assert!(widest_navigable(&gaps).is_none());
    }

    #[test]
    fn test_obstructed_middle_breaks_gap() {
        let frame = frame_from_normalized([0.0, 0.0, 150.0, 80.0, 150.0, 0.0, 0.0]);
        assert!(detect_gaps(&frame, &GapConfig::default(), 4.0, 0.0).is_empty());
    }

    #[test]
    fn test_span_limit() {
        let frame = frame_from_normalized([150.0, 0.0, 0.0, 0.0, 0.0, 150.0, 0.0]);
        assert!(detect_gaps(&frame, &GapConfig::default(), 4.0, 0.0).is_empty());
    }

    #[test]
    fn test_first_partner_only() {
        let frame = frame_from_normalized([150.0, 0.0, 150.0, 0.0, 0.0, 0.0, 0.0]);
        let gaps = detect_gaps(&frame, &GapConfig::default(), 4.0, 0.0);
        // 0 pairs with 2, then 2 has no partner left within span
        assert_eq!(gaps.len(), 1);
        assert_eq!((gaps[0].left, gaps[0].right), (0, 2));
    }
}
