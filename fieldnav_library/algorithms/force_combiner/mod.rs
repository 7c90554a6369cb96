//! Force Combiner
//!
//! Blends the attractive and repulsive directions into one desired heading.
//! Only directions are blended; magnitudes set the weights, never the heading.

use super::sensor_frame::{ProximityThresholds, SensorFrame};
use crate::messages::{wrap_angle, Force2D};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinerConfig {
    /// Repulsion below this magnitude is ignored
    pub activation: f64,
    pub normalizer: f64,
    /// Upper bound on the repulsive weight
    pub cap: f64,
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            activation: 0.5,
            normalizer: 3.5,
            cap: 0.85,
        }
    }
}

/// Result of blending the two fields
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blend {
    /// World-frame desired heading
    pub heading: f64,
    pub weight_rep: f64,
    pub weight_att: f64,
    /// Speed multiplier from repulsion strength, in (0, 1]
    pub slowdown: f64,
}

/// Combine attractive bearing with the summed repulsive force
pub fn combine(config: &CombinerConfig, attractive_bearing: f64, repulsive: &Force2D) -> Blend {
    let rep_magnitude = repulsive.magnitude();
    if rep_magnitude <= config.activation {
        return Blend {
            heading: wrap_angle(attractive_bearing),
            weight_rep: 0.0,
            weight_att: 1.0,
            slowdown: 1.0,
        };
    }

    let weight_rep = (rep_magnitude / config.normalizer).min(config.cap);
    let weight_att = 1.0 - weight_rep;
    let rep_angle = repulsive.angle();

    let x = weight_att * attractive_bearing.cos() + weight_rep * rep_angle.cos();
    let y = weight_att * attractive_bearing.sin() + weight_rep * rep_angle.sin();

    Blend {
        heading: y.atan2(x),
        weight_rep,
        weight_att,
        slowdown: repulsion_slowdown(weight_rep),
    }
}

/// Speed multiplier for a repulsive weight
pub fn repulsion_slowdown(weight_rep: f64) -> f64 {
    if weight_rep > 0.7 {
        (1.0 - 0.4 * weight_rep).max(0.5)
    } else if weight_rep > 0.4 {
        (1.0 - 0.3 * weight_rep).max(0.7)
    } else {
        (1.0 - 0.2 * weight_rep).max(0.85)
    }
}

/// Limit turns toward a side that is already crowded
///
/// `heading_error` is robot-relative, positive to the left.
pub fn lateral_guard(
    heading_error: f64,
    frame: &SensorFrame,
    thresholds: &ProximityThresholds,
) -> f64 {
    let left = frame.max_left_normalized();
    let right = frame.max_right_normalized();

    if left >= thresholds.critical && heading_error > 0.3 {
        0.1
    } else if right >= thresholds.critical && heading_error < -0.3 {
        -0.1
    } else if left >= thresholds.warning && heading_error > 0.5 {
        heading_error * 0.5
    } else if right >= thresholds.warning && heading_error < -0.5 {
        heading_error * 0.5
    } else {
        heading_error
    }
}
