//! Repulsive Field
//!
//! Per-sensor repulsion pushing the robot away from detected obstacles.
//!
//! # Features
//!
//! - Three-band magnitude law: saturated contact, inverse-square near
//!   field, cubic far field fading to zero at the influence radius
//! - Frontal boost when something is close ahead
//! - Weakened repulsion for obstacles bounding a navigable gap
//! - Per-sensor contributions kept for diagnostics
//!
//! # Example
//!
//! ```rust
//! use fieldnav_library::algorithms::repulsive_field::RepulsiveConfig;
//!
//! let config = RepulsiveConfig::default();
//! // Beyond the influence radius there is no push
//! assert_eq!(config.magnitude(120.0, 17.0, config.k_rep), 0.0);
//! // Touching the robot body saturates
//! assert_eq!(config.magnitude(17.5, 17.0, config.k_rep), 3000.0);
//! ```

use super::gap::Gap;
use super::sensor_frame::{ProximityThresholds, SensorFrame};
use crate::messages::{Force2D, SENSOR_COUNT};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepulsiveConfig {
    pub k_rep: f64,
    /// Obstacles farther than this (cm, from robot centre) are ignored
    pub influence_radius: f64,
    /// Clearance where the near-field law takes over
    pub safety_distance: f64,
    /// Clearance below which repulsion saturates
    pub min_clearance: f64,
    pub saturation_multiplier: f64,
    pub boost_critical: f64,
    pub boost_warning: f64,
}

impl Default for RepulsiveConfig {
    fn default() -> Self {
        Self {
            k_rep: 300.0,
            influence_radius: 100.0,
            safety_distance: 20.0,
            min_clearance: 1.0,
            saturation_multiplier: 10.0,
            boost_critical: 2.0,
            boost_warning: 1.5,
        }
    }
}

impl RepulsiveConfig {
    /// Magnitude for one obstacle at `distance` from the robot centre
    pub fn magnitude(&self, distance: f64, robot_radius: f64, k: f64) -> f64 {
        if !distance.is_finite() || distance >= self.influence_radius {
            return 0.0;
        }
        let clearance = distance - robot_radius;
        if clearance < self.min_clearance {
            k * self.saturation_multiplier
        } else if clearance < self.safety_distance {
            let x = 1.0 / clearance - 1.0 / self.safety_distance;
            k * x * x
        } else {
            k * (self.safety_distance / clearance).powi(3)
                * (1.0 - distance / self.influence_radius)
        }
    }

    /// Gain multiplier from the strongest frontal reading
    pub fn frontal_boost(&self, frame: &SensorFrame, thresholds: &ProximityThresholds) -> f64 {
        let frontal = frame.max_frontal_normalized();
        if frontal >= thresholds.critical {
            self.boost_critical
        } else if frontal >= thresholds.warning {
            self.boost_warning
        } else {
            1.0
        }
    }
}

/// Summed repulsion for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Repulsion {
    pub total: Force2D,
    /// World-frame force from each sensor
    pub contributions: [Force2D; SENSOR_COUNT],
    /// Frontal boost applied to `k_rep`
    pub boost: f64,
}

impl Repulsion {
    pub fn magnitude(&self) -> f64 {
        self.total.magnitude()
    }
}

/// Tick-scoped inputs that modulate the field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepulsionContext<'a> {
    pub robot_radius: f64,
    pub heading: f64,
    /// Trap-driven multiplier on `k_rep`
    pub gain_scale: f64,
    pub gaps: &'a [Gap],
    pub gap_scale: f64,
}

/// Evaluate the repulsive field over every detected sensor
pub fn repel(
    config: &RepulsiveConfig,
    thresholds: &ProximityThresholds,
    frame: &SensorFrame,
    ctx: &RepulsionContext<'_>,
) -> Repulsion {
    let boost = config.frontal_boost(frame, thresholds);
    let k = config.k_rep * boost * ctx.gain_scale;

    let mut total = Force2D::zero();
    let mut contributions = [Force2D::zero(); SENSOR_COUNT];

    for (index, reading) in frame.readings().iter().enumerate() {
        if !reading.detected {
            continue;
        }
        let mut magnitude = config.magnitude(reading.distance, ctx.robot_radius, k);
        if magnitude == 0.0 {
            continue;
        }
        if ctx.gaps.iter().any(|g| g.navigable && g.bounds(index)) {
            magnitude *= ctx.gap_scale;
        }
        let force = Force2D::from_polar(magnitude, ctx.heading + reading.bearing + PI);
        contributions[index] = force;
        total += force;
    }

    Repulsion {
        total,
        contributions,
        boost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::sensor_frame::SensorCalibration;
    use approx::assert_relative_eq;

    fn frame_at(distances: [Option<f64>; SENSOR_COUNT]) -> SensorFrame {
        let cal = SensorCalibration::default();
        let raw = std::array::from_fn(|i| match distances[i] {
            Some(d) => cal.reading_for_distance(i, d),
            None => 0.0,
        });
        SensorFrame::build(&cal, &ProximityThresholds::default(), &raw)
    }

    fn ctx(gaps: &[Gap]) -> RepulsionContext<'_> {
        RepulsionContext {
            robot_radius: 17.0,
            heading: 0.0,
            gain_scale: 1.0,
            gaps,
            gap_scale: 0.3,
        }
    }

    #[test]
    fn test_magnitude_bands() {
        let c = RepulsiveConfig::default();
        // Near field: clearance 10
        let near = c.magnitude(27.0, 17.0, 300.0);
        assert_relative_eq!(near, 300.0 * (0.1f64 - 0.05).powi(2), epsilon = 1e-12);
        // Far field: clearance 30
        let far = c.magnitude(47.0, 17.0, 300.0);
        assert_relative_eq!(far, 300.0 * (20.0f64 / 30.0).powi(3) * 0.53, epsilon = 1e-9);
        // Saturated
        assert_relative_eq!(c.magnitude(10.0, 17.0, 300.0), 3000.0);
        assert_eq!(c.magnitude(f64::INFINITY, 17.0, 300.0), 0.0);
    }

    #[test]
    fn test_no_obstacles_no_force() {
        let frame = frame_at([None; SENSOR_COUNT]);
        let r = repel(
            &RepulsiveConfig::default(),
            &ProximityThresholds::default(),
            &frame,
            &ctx(&[]),
        );
        assert!(r.total.is_zero());
        assert_eq!(r.boost, 1.0);
    }

    #[test]
    fn test_force_points_away_from_obstacle() {
        let mut d = [None; SENSOR_COUNT];
        d[3] = Some(40.0);
        let frame = frame_at(d);
        let r = repel(
            &RepulsiveConfig::default(),
            &ProximityThresholds::default(),
            &frame,
            &ctx(&[]),
        );
        // Obstacle ahead, force points backward
        assert!(r.total.x < 0.0);
        let expected_angle = (-3.0f64).to_radians() + PI;
        assert_relative_eq!(
            crate::messages::wrap_angle(r.total.angle() - expected_angle),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_frontal_boost() {
        let cal = SensorCalibration::default();
        let config = RepulsiveConfig::default();
        let thresholds = ProximityThresholds::default();

        let mut raw = [0.0; SENSOR_COUNT];
        raw[3] = 200.0 * cal.factors[3];
        let frame = SensorFrame::build(&cal, &thresholds, &raw);
        assert_eq!(config.frontal_boost(&frame, &thresholds), 1.5);

        raw[3] = 400.0 * cal.factors[3];
        let frame = SensorFrame::build(&cal, &thresholds, &raw);
        assert_eq!(config.frontal_boost(&frame, &thresholds), 2.0);

        // Side readings never boost
        let mut raw = [0.0; SENSOR_COUNT];
        raw[0] = 400.0 * cal.factors[0];
        let frame = SensorFrame::build(&cal, &thresholds, &raw);
        assert_eq!(config.frontal_boost(&frame, &thresholds), 1.0);
    }

    #[test]
    fn test_gap_bounds_are_weakened() {
        let mut d = [None; SENSOR_COUNT];
        d[0] = Some(45.0);
        d[2] = Some(45.0);
        let frame = frame_at(d);
        let config = RepulsiveConfig::default();
        let thresholds = ProximityThresholds::default();

        let plain = repel(&config, &thresholds, &frame, &ctx(&[]));
        let gap = Gap {
            left: 0,
            right: 2,
            width: 40.0,
            bearing: 0.5,
            navigable: true,
        };
        let gaps = [gap];
        let weakened = repel(&config, &thresholds, &frame, &ctx(&gaps));

        for i in [0, 2] {
            assert_relative_eq!(
                weakened.contributions[i].magnitude(),
                0.3 * plain.contributions[i].magnitude(),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_gain_scale_multiplies() {
        let mut d = [None; SENSOR_COUNT];
        d[5] = Some(30.0);
        let frame = frame_at(d);
        let config = RepulsiveConfig::default();
        let thresholds = ProximityThresholds::default();
        let base = repel(&config, &thresholds, &frame, &ctx(&[]));
        let scaled = repel(
            &config,
            &thresholds,
            &frame,
            &RepulsionContext {
                gain_scale: 1.5,
                ..ctx(&[])
            },
        );
        assert_relative_eq!(scaled.magnitude(), 1.5 * base.magnitude(), epsilon = 1e-9);
    }
}
