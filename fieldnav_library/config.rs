//! Navigator configuration
//!
//! Every gain, threshold and table the control loop uses, grouped by
//! stage. All sections default, so a file only needs the values it
//! changes:
//!
//! ```yaml
//! attractive:
//!   law: exponential
//!   k: 2.5
//!   lambda: 50.0
//!   c: 20.0
//! governor:
//!   ramp_policy: reset_per_waypoint
//! mission:
//!   settle_ticks: 10
//! ```

use crate::algorithms::attractive_field::AttractiveLaw;
use crate::algorithms::differential_drive::{RobotConfig, SteeringConfig};
use crate::algorithms::force_combiner::CombinerConfig;
use crate::algorithms::gap::GapConfig;
use crate::algorithms::recovery::RecoveryConfig;
use crate::algorithms::repulsive_field::RepulsiveConfig;
use crate::algorithms::sensor_frame::{ProximityThresholds, SensorCalibration};
use crate::algorithms::trap_detector::TrapConfig;
use crate::algorithms::velocity_governor::GovernorConfig;
use crate::algorithms::waypoint_sequencer::SequencerConfig;
use fieldnav_core::error::{NavError, NavResult};
use fieldnav_core::params;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Nominal control period (s)
    pub dt: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self { dt: 0.05 }
    }
}

impl ControlConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.dt)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub robot: RobotConfig,
    pub control: ControlConfig,
    pub sensors: SensorCalibration,
    pub thresholds: ProximityThresholds,
    pub attractive: AttractiveLaw,
    pub repulsive: RepulsiveConfig,
    pub gap: GapConfig,
    pub combiner: CombinerConfig,
    pub trap: TrapConfig,
    pub governor: GovernorConfig,
    pub steering: SteeringConfig,
    pub mission: SequencerConfig,
    pub recovery: RecoveryConfig,
}

fn positive(name: &str, value: f64) -> NavResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(NavError::config(format!("{} must be positive, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: f64) -> NavResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(NavError::config(format!("{} must not be negative, got {}", name, value)))
    }
}

impl NavConfig {
    /// Load from YAML, TOML or JSON (by extension) and validate
    pub fn load(path: &Path) -> NavResult<Self> {
        let config: NavConfig = params::load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> NavResult<()> {
        params::save(self, path)
    }

    /// Reject configurations that would break the speed guarantees
    pub fn validate(&self) -> NavResult<()> {
        positive("control.dt", self.control.dt)?;

        let robot = &self.robot;
        positive("robot.wheel_base", robot.wheel_base)?;
        positive("robot.radius", robot.radius)?;
        positive("robot.max_wheel_speed", robot.max_wheel_speed)?;
        positive("robot.max_wheel_differential", robot.max_wheel_differential)?;

        if !self.thresholds.is_ascending() {
            return Err(NavError::config(
                "thresholds must satisfy 0 < detect < caution < warning < critical < emergency",
            ));
        }
        for (i, factor) in self.sensors.factors.iter().enumerate() {
            positive(&format!("sensors.factors[{}]", i), *factor)?;
        }
        let model = &self.sensors.model;
        positive("sensors.model.ref_reading", model.ref_reading)?;
        positive("sensors.model.ref_distance", model.ref_distance)?;
        positive("sensors.model.exponent_near", model.exponent_near)?;
        positive("sensors.model.exponent_far", model.exponent_far)?;
        if model.min_distance > model.max_distance {
            return Err(NavError::config("sensors.model.min_distance exceeds max_distance"));
        }

        if !self.attractive.is_valid() {
            return Err(NavError::config(format!(
                "attractive law {} needs positive parameters",
                self.attractive.name()
            )));
        }

        positive("repulsive.k_rep", self.repulsive.k_rep)?;
        positive("repulsive.influence_radius", self.repulsive.influence_radius)?;
        positive("repulsive.safety_distance", self.repulsive.safety_distance)?;
        non_negative("gap.repulsion_scale", self.gap.repulsion_scale)?;

        positive("combiner.normalizer", self.combiner.normalizer)?;
        if !(self.combiner.cap > 0.0 && self.combiner.cap < 1.0) {
            return Err(NavError::config(format!(
                "combiner.cap must be in (0, 1), got {}",
                self.combiner.cap
            )));
        }

        self.validate_speeds()?;

        non_negative("mission.drift_per_cm", self.mission.drift_per_cm)?;
        positive("mission.max_tolerance", self.mission.max_tolerance)?;
        if self.mission.max_collisions == 0 {
            return Err(NavError::config("mission.max_collisions must be at least 1"));
        }
        let approach = &self.mission.fine_approach;
        if approach.enabled {
            non_negative("mission.fine_approach.finish_distance", approach.finish_distance)?;
            positive("mission.fine_approach.min_speed", approach.min_speed)?;
            non_negative("mission.fine_approach.speed_gain", approach.speed_gain)?;
            non_negative("mission.fine_approach.angular_gain", approach.angular_gain)?;
        }

        let recovery = &self.recovery;
        non_negative("recovery.backoff_duration", recovery.backoff_duration)?;
        non_negative("recovery.pause_duration", recovery.pause_duration)?;
        non_negative("recovery.escape_reverse_duration", recovery.escape_reverse_duration)?;
        non_negative("recovery.escape_turn_duration", recovery.escape_turn_duration)?;
        positive("recovery.stall_window", recovery.stall_window)?;
        non_negative("recovery.progress_eps", recovery.progress_eps)?;
        Ok(())
    }

    fn validate_speeds(&self) -> NavResult<()> {
        let governor = &self.governor;
        positive("governor.v_max", governor.v_max)?;
        positive("governor.decel_rate", governor.decel_rate)?;
        non_negative("governor.ramp_rate", governor.ramp_rate)?;
        non_negative("governor.v_start_min", governor.v_start_min)?;

        if governor.v_max > self.robot.max_wheel_speed {
            return Err(NavError::config(format!(
                "governor.v_max {} exceeds robot.max_wheel_speed {}",
                governor.v_max, self.robot.max_wheel_speed
            )));
        }
        if governor.v_start_min > governor.v_max {
            return Err(NavError::config("governor.v_start_min exceeds governor.v_max"));
        }

        let mut previous = 0.0;
        for tier in &governor.tiers {
            positive("governor.tiers.ceiling", tier.ceiling)?;
            if tier.ceiling < previous || tier.ceiling > governor.v_max {
                return Err(NavError::config(format!(
                    "tier {} ceiling {} must be ascending and at most v_max",
                    tier.level, tier.ceiling
                )));
            }
            previous = tier.ceiling;
        }

        // Floors must fit under every ceiling or invariants conflict
        let lowest = governor
            .tiers
            .iter()
            .map(|t| t.ceiling)
            .fold(governor.v_max, f64::min);
        let trap_floor = if self.trap.enabled {
            self.trap.min_forward_speed
        } else {
            0.0
        };
        let arc_floor = self.steering.max_arc_speed();
        if trap_floor > lowest || arc_floor > lowest {
            return Err(NavError::config(format!(
                "lowest speed ceiling {} is below a guaranteed minimum (trap {}, arc {})",
                lowest, trap_floor, arc_floor
            )));
        }
        Ok(())
    }
}
