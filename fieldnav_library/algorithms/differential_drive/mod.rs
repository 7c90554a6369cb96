//! Differential Drive Mapping
//!
//! Kinematics for a two-wheeled base and the mapping from a desired
//! (speed, heading error) pair to bounded wheel speeds.
//!
//! # Features
//!
//! - Forward kinematics (wheel speeds → robot velocity)
//! - Inverse kinematics (robot velocity → wheel speeds)
//! - Odometry integration
//! - Angular gain schedule (trap, crowded corners, goal approach)
//! - Minimum-arc constraint: no point turns and no reversing wheel while
//!   navigating
//! - Wheel saturation preserving the left/right ratio
//!
//! # Example
//!
//! ```rust
//! use fieldnav_library::algorithms::differential_drive::DifferentialDrive;
//!
//! let dd = DifferentialDrive::new(23.5, 38.0, 10.0); // wheel_base, max wheel speed, max differential
//!
//! // Convert robot velocity to wheel speeds
//! let (left, right) = dd.inverse_kinematics(20.0, 0.5);
//!
//! // And back
//! let (linear, angular) = dd.forward_kinematics(left, right);
//! assert!((linear - 20.0).abs() < 1e-9);
//! assert!((angular - 0.5).abs() < 1e-9);
//! ```

use super::sensor_frame::{ProximityThresholds, SensorFrame};
use super::velocity_governor::{band_value, Band};
use crate::messages::{wrap_angle, Pose2D, VelocityCommand};
use serde::{Deserialize, Serialize};

/// Physical robot parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Distance between the wheels (cm)
    pub wheel_base: f64,
    /// Body radius (cm)
    pub radius: f64,
    /// Hardware wheel speed limit (cm/s)
    pub max_wheel_speed: f64,
    /// Largest wheel speed difference from the mean used for turning (cm/s)
    pub max_wheel_differential: f64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            wheel_base: 23.5,
            radius: 17.095,
            max_wheel_speed: 38.0,
            max_wheel_differential: 10.0,
        }
    }
}

impl RobotConfig {
    pub fn diameter(&self) -> f64 {
        2.0 * self.radius
    }

    pub fn drive(&self) -> DifferentialDrive {
        DifferentialDrive::new(
            self.wheel_base,
            self.max_wheel_speed,
            self.max_wheel_differential,
        )
    }
}

/// Angular gain schedule and arc constraint bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    pub k_angular: f64,
    pub corner_critical_boost: f64,
    pub corner_warning_boost: f64,
    /// Goal distance below which turning is softened
    pub near_goal_distance: f64,
    /// Distance at which the softened gain reaches its minimum
    pub near_goal_offset: f64,
    pub near_goal_span: f64,
    pub near_goal_min_scale: f64,
    /// Minimum slower-wheel speed by goal distance
    pub arc_bands: Vec<Band>,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            k_angular: 3.0,
            corner_critical_boost: 1.5,
            corner_warning_boost: 1.25,
            near_goal_distance: 15.0,
            near_goal_offset: 5.0,
            near_goal_span: 10.0,
            near_goal_min_scale: 0.3,
            arc_bands: vec![
                Band { above: 30.0, value: 4.0 },
                Band { above: 10.0, value: 2.0 },
            ],
        }
    }
}

impl SteeringConfig {
    /// Slowest wheel speed allowed at a goal distance
    pub fn min_wheel_speed(&self, distance: f64) -> f64 {
        band_value(&self.arc_bands, distance, 0.0)
    }

    /// Largest band minimum, the strongest floor the arc constraint imposes
    pub fn max_arc_speed(&self) -> f64 {
        self.arc_bands.iter().map(|b| b.value).fold(0.0, f64::max)
    }

    /// Effective angular gain for this tick
    ///
    /// `trap_scale` is the trap detector's angular multiplier while trapped,
    /// `None` when free.
    pub fn angular_gain(
        &self,
        frame: &SensorFrame,
        thresholds: &ProximityThresholds,
        trap_scale: Option<f64>,
        distance: f64,
    ) -> f64 {
        let trapped = trap_scale.is_some();
        let corner = frame.max_corner_normalized();

        let mut gain = self.k_angular;
        if let Some(scale) = trap_scale {
            gain *= scale;
        } else if corner >= thresholds.critical {
            gain *= self.corner_critical_boost;
        } else if corner >= thresholds.warning {
            gain *= self.corner_warning_boost;
        }

        if distance < self.near_goal_distance && corner < thresholds.caution && !trapped {
            let scale = self.near_goal_min_scale
                + (1.0 - self.near_goal_min_scale) * (distance - self.near_goal_offset)
                    / self.near_goal_span;
            gain *= scale.clamp(self.near_goal_min_scale, 1.0);
        }
        gain
    }
}

/// Differential drive kinematics with wheel limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferentialDrive {
    wheel_base: f64,
    max_wheel_speed: f64,
    max_wheel_differential: f64,
}

impl DifferentialDrive {
    /// Create new differential drive kinematics
    ///
    /// # Arguments
    /// * `wheel_base` - Distance between left and right wheels (cm)
    /// * `max_wheel_speed` - Per-wheel speed limit (cm/s)
    /// * `max_wheel_differential` - Turning share of a wheel's speed (cm/s)
    pub fn new(wheel_base: f64, max_wheel_speed: f64, max_wheel_differential: f64) -> Self {
        Self {
            wheel_base,
            max_wheel_speed,
            max_wheel_differential,
        }
    }

    pub fn half_base(&self) -> f64 {
        self.wheel_base / 2.0
    }

    /// Angular speed reachable with the allowed wheel differential
    pub fn omega_max(&self) -> f64 {
        self.max_wheel_differential / self.half_base()
    }

    /// Inverse kinematics: robot velocity (cm/s, rad/s) to wheel speeds
    pub fn inverse_kinematics(&self, linear: f64, angular: f64) -> (f64, f64) {
        let left = linear - angular * self.half_base();
        let right = linear + angular * self.half_base();
        (left, right)
    }

    /// Forward kinematics: wheel speeds to robot velocity
    pub fn forward_kinematics(&self, left_speed: f64, right_speed: f64) -> (f64, f64) {
        let linear = (left_speed + right_speed) / 2.0;
        let angular = (right_speed - left_speed) / self.wheel_base;
        (linear, angular)
    }

    /// Integrate a pose over `dt` seconds at constant wheel speeds
    pub fn update_odometry(&self, pose: &Pose2D, left_speed: f64, right_speed: f64, dt: f64) -> Pose2D {
        let (linear, angular) = self.forward_kinematics(left_speed, right_speed);
        let mid_theta = pose.theta + angular * dt / 2.0;
        Pose2D {
            x: pose.x + linear * mid_theta.cos() * dt,
            y: pose.y + linear * mid_theta.sin() * dt,
            theta: wrap_angle(pose.theta + angular * dt),
        }
    }

    /// Scale both wheels down together so neither exceeds the limit
    pub fn saturate_wheel_speeds(&self, left: f64, right: f64) -> (f64, f64) {
        let peak = left.abs().max(right.abs());
        if peak <= self.max_wheel_speed || peak == 0.0 {
            return (left, right);
        }
        let scale = self.max_wheel_speed / peak;
        (left * scale, right * scale)
    }

    /// Wheel command for a forward speed and robot-relative heading error
    ///
    /// With `min_wheel_speed = Some(m)` the arc constraint keeps the slower
    /// wheel at or above `m`; `None` disables it (inside the arrival
    /// tolerance).
    pub fn map(
        &self,
        linear: f64,
        heading_error: f64,
        gain: f64,
        min_wheel_speed: Option<f64>,
    ) -> VelocityCommand {
        let half = self.half_base();
        let omega_max = self.omega_max();
        let mut omega = (gain * wrap_angle(heading_error)).clamp(-omega_max, omega_max);

        if let Some(min_speed) = min_wheel_speed {
            let arc_limit = ((linear - min_speed) / half).max(0.0);
            omega = omega.clamp(-arc_limit, arc_limit);
        }

        let headroom = ((self.max_wheel_speed - linear) / half).max(0.0);
        omega = omega.clamp(-headroom, headroom);

        let (left, right) = self.inverse_kinematics(linear, omega);
        let left = left.clamp(-self.max_wheel_speed, self.max_wheel_speed);
        let right = right.clamp(-self.max_wheel_speed, self.max_wheel_speed);

        VelocityCommand {
            v_linear: linear,
            omega,
            v_left: left,
            v_right: right,
        }
    }

    pub fn wheel_base(&self) -> f64 {
        self.wheel_base
    }

    pub fn max_wheel_speed(&self) -> f64 {
        self.max_wheel_speed
    }
}

impl Default for DifferentialDrive {
    fn default() -> Self {
        RobotConfig::default().drive()
    }
}
