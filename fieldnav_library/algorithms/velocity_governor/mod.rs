//! Velocity Governor
//!
//! Predictive braking and speed shaping for the forward velocity.
//!
//! # Features
//!
//! - Brake-distance aware safety table (five levels, first match wins)
//! - Speed bonus through wide navigable gaps
//! - Acceleration ramp whose memory is owned by the caller
//! - Heading, repulsion and lateral-clearance derating
//! - Guaranteed minimum speeds so the robot never stalls in the open
//!
//! The governor itself is stateless. The ramp memory is passed in by
//! `&mut` every tick so the owner decides when it resets.
//!
//! # Example
//!
//! ```rust
//! use fieldnav_library::algorithms::velocity_governor::{RampMemory, VelocityGovernor};
//! use fieldnav_library::algorithms::sensor_frame::{ProximityThresholds, SensorCalibration, SensorFrame};
//! use fieldnav_library::messages::SafetyLevel;
//!
//! let governor = VelocityGovernor::default();
//! let frame = SensorFrame::build(
//!     &SensorCalibration::default(),
//!     &ProximityThresholds::default(),
//!     &[0.0; 7],
//! );
//! let assessment = governor.assess(&frame, 17.0, &RampMemory::default());
//! assert_eq!(assessment.level, SafetyLevel::Clear);
//! assert_eq!(assessment.ceiling, 38.0);
//! ```

use super::gap::{widest_navigable, Gap};
use super::sensor_frame::SensorFrame;
use crate::messages::SafetyLevel;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Frontal condition that forces a tier regardless of effective clearance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontalLimit {
    /// Minimum frontal clearance (distance minus robot radius) below this
    Clearance(f64),
    /// Minimum frontal distance below this
    Distance(f64),
}

/// One row of the safety table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyTier {
    pub level: SafetyLevel,
    /// Effective clearance below which this tier applies
    pub effective_below: f64,
    pub frontal: FrontalLimit,
    /// Speed ceiling (cm/s)
    pub ceiling: f64,
}

/// Whether ramp memory survives waypoint transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampPolicy {
    #[default]
    Persist,
    ResetPerWaypoint,
}

/// Distance-banded value, first band whose threshold is exceeded wins
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub above: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    pub v_max: f64,
    /// Deceleration used for the brake-distance estimate (cm/s²)
    pub decel_rate: f64,
    pub v_start_min: f64,
    /// Acceleration ramp (cm/s²)
    pub ramp_rate: f64,
    pub ramp_policy: RampPolicy,
    /// Checked top to bottom; nothing matching means `Clear` at `v_max`
    pub tiers: Vec<SafetyTier>,
    pub gap_bonus_wide_margin: f64,
    pub gap_bonus_wide: f64,
    pub gap_bonus_margin: f64,
    pub gap_bonus: f64,
    /// Minimum heading factor by goal distance, descending thresholds
    pub heading_floors: Vec<Band>,
    pub heading_floor_default: f64,
    /// Speed factor by minimum lateral clearance, checked as `clearance < above`
    pub lateral_slowdown: Vec<Band>,
    /// Goal distance beyond which a clear path keeps at least `v_start_min`
    pub cruise_floor_distance: f64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            v_max: 38.0,
            decel_rate: 20.0,
            v_start_min: 8.0,
            ramp_rate: 10.0,
            ramp_policy: RampPolicy::Persist,
            tiers: vec![
                SafetyTier {
                    level: SafetyLevel::Emergency,
                    effective_below: 5.0,
                    frontal: FrontalLimit::Clearance(3.0),
                    ceiling: 8.0,
                },
                SafetyTier {
                    level: SafetyLevel::Critical,
                    effective_below: 12.0,
                    frontal: FrontalLimit::Clearance(8.0),
                    ceiling: 15.0,
                },
                SafetyTier {
                    level: SafetyLevel::Warning,
                    effective_below: 20.0,
                    frontal: FrontalLimit::Distance(15.0),
                    ceiling: 25.0,
                },
                SafetyTier {
                    level: SafetyLevel::Caution,
                    effective_below: 30.0,
                    frontal: FrontalLimit::Distance(25.0),
                    ceiling: 35.0,
                },
            ],
            gap_bonus_wide_margin: 30.0,
            gap_bonus_wide: 1.3,
            gap_bonus_margin: 15.0,
            gap_bonus: 1.15,
            heading_floors: vec![
                Band { above: 50.0, value: 0.6 },
                Band { above: 20.0, value: 0.4 },
            ],
            heading_floor_default: 0.2,
            lateral_slowdown: vec![
                Band { above: 5.0, value: 0.4 },
                Band { above: 10.0, value: 0.65 },
                Band { above: 15.0, value: 0.8 },
            ],
            cruise_floor_distance: 30.0,
        }
    }
}

/// Acceleration-ramp memory owned by the control loop
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RampMemory {
    pub last_linear: f64,
}

impl RampMemory {
    pub fn reset(&mut self) {
        self.last_linear = 0.0;
    }
}

/// Result of the predictive-braking table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyAssessment {
    pub level: SafetyLevel,
    pub ceiling: f64,
    pub brake_distance: f64,
    pub frontal_clearance: f64,
    pub frontal_distance: f64,
    pub effective_clearance: f64,
}

/// Everything the governor needs for one tick
#[derive(Debug, Clone, Copy)]
pub struct GovernorInputs<'a> {
    pub frame: &'a SensorFrame,
    pub gaps: &'a [Gap],
    pub robot_radius: f64,
    /// Speed requested by the attractive law
    pub attractive_speed: f64,
    pub distance_to_goal: f64,
    pub arrival_tolerance: f64,
    /// Robot-relative heading error after the lateral guard
    pub heading_error: f64,
    /// Repulsion slowdown from the combiner
    pub repulsion_slowdown: f64,
    /// Forward speed guaranteed by the trap detector, zero when free
    pub trap_min_speed: f64,
    /// Slowest wheel speed the arc constraint will accept
    pub min_wheel_speed: f64,
    pub dt: f64,
}

/// Governed forward speed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Governed {
    pub linear: f64,
    pub assessment: SafetyAssessment,
}

/// Stateless speed governor
#[derive(Debug, Clone, Default)]
pub struct VelocityGovernor {
    config: GovernorConfig,
}

/// Value of the first band whose threshold `x` exceeds
pub fn band_value(bands: &[Band], x: f64, default: f64) -> f64 {
    bands
        .iter()
        .find(|b| x > b.above)
        .map(|b| b.value)
        .unwrap_or(default)
}

impl VelocityGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Classify the frontal situation and pick a speed ceiling
    pub fn assess(
        &self,
        frame: &SensorFrame,
        robot_radius: f64,
        memory: &RampMemory,
    ) -> SafetyAssessment {
        let v_ref = if memory.last_linear > 0.0 {
            memory.last_linear
        } else {
            self.config.v_start_min
        };
        let brake_distance = v_ref * v_ref / (2.0 * self.config.decel_rate);
        let frontal_distance = frame.min_frontal_distance();
        let frontal_clearance = frontal_distance - robot_radius;
        let effective_clearance = frontal_clearance - brake_distance;

        let tier = self.config.tiers.iter().find(|tier| {
            let frontal_hit = match tier.frontal {
                FrontalLimit::Clearance(limit) => frontal_clearance < limit,
                FrontalLimit::Distance(limit) => frontal_distance < limit,
            };
            effective_clearance < tier.effective_below || frontal_hit
        });

        let (level, ceiling) = match tier {
            Some(tier) => (tier.level, tier.ceiling),
            None => (SafetyLevel::Clear, self.config.v_max),
        };

        SafetyAssessment {
            level,
            ceiling,
            brake_distance,
            frontal_clearance,
            frontal_distance,
            effective_clearance,
        }
    }

    /// Ceiling after the wide-gap bonus
    pub fn gap_bonus(&self, ceiling: f64, gaps: &[Gap], robot_diameter: f64) -> f64 {
        let Some(gap) = widest_navigable(gaps) else {
            return ceiling;
        };
        let boosted = if gap.width > robot_diameter + self.config.gap_bonus_wide_margin {
            ceiling * self.config.gap_bonus_wide
        } else if gap.width > robot_diameter + self.config.gap_bonus_margin {
            ceiling * self.config.gap_bonus
        } else {
            ceiling
        };
        boosted.min(self.config.v_max)
    }

    /// Minimum heading factor for a goal distance
    pub fn heading_floor(&self, distance: f64) -> f64 {
        band_value(
            &self.config.heading_floors,
            distance,
            self.config.heading_floor_default,
        )
    }

    /// Speed factor for the closest lateral obstacle
    pub fn lateral_factor(&self, lateral_clearance: f64) -> f64 {
        self.config
            .lateral_slowdown
            .iter()
            .find(|b| lateral_clearance < b.above)
            .map(|b| b.value)
            .unwrap_or(1.0)
    }

    /// Forward speed for this tick
    ///
    /// Updates `memory` with the ramped base speed, before derating.
    pub fn govern(&self, inputs: &GovernorInputs<'_>, memory: &mut RampMemory) -> Governed {
        let config = &self.config;
        let mut assessment = self.assess(inputs.frame, inputs.robot_radius, memory);
        assessment.ceiling =
            self.gap_bonus(assessment.ceiling, inputs.gaps, 2.0 * inputs.robot_radius);
        let ceiling = assessment.ceiling;

        let ramp_limit = (memory.last_linear + config.ramp_rate * inputs.dt).max(config.v_start_min);
        let base = inputs
            .attractive_speed
            .max(0.0)
            .min(ceiling)
            .min(config.v_max)
            .min(ramp_limit);
        memory.last_linear = base;

        let heading_factor = inputs
            .heading_error
            .cos()
            .max(self.heading_floor(inputs.distance_to_goal));
        let lateral = self.lateral_factor(inputs.frame.min_lateral_clearance(inputs.robot_radius));
        let mut linear = base * inputs.repulsion_slowdown * heading_factor * lateral;

        if assessment.level == SafetyLevel::Clear
            && inputs.distance_to_goal > config.cruise_floor_distance
        {
            linear = linear.max(config.v_start_min);
        }
        linear = linear.max(inputs.trap_min_speed);
        if inputs.distance_to_goal > inputs.arrival_tolerance {
            linear = linear.max(inputs.min_wheel_speed);
        }
        linear = linear.min(ceiling);

        trace!(
            level = %assessment.level,
            ceiling,
            base,
            linear,
            effective = assessment.effective_clearance,
            "governed speed"
        );

        Governed { linear, assessment }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::sensor_frame::{ProximityThresholds, SensorCalibration};
    use crate::messages::SENSOR_COUNT;
    use approx::assert_relative_eq;

    const RADIUS: f64 = 17.095;

    fn frame_at(distances: [Option<f64>; SENSOR_COUNT]) -> SensorFrame {
        let cal = SensorCalibration::default();
        let raw = std::array::from_fn(|i| match distances[i] {
            Some(d) => cal.reading_for_distance(i, d),
            None => 0.0,
        });
        SensorFrame::build(&cal, &ProximityThresholds::default(), &raw)
    }

    fn frontal(distance: f64) -> SensorFrame {
        let mut d = [None; SENSOR_COUNT];
        d[3] = Some(distance);
        frame_at(d)
    }

    fn inputs<'a>(frame: &'a SensorFrame, distance: f64) -> GovernorInputs<'a> {
        GovernorInputs {
            frame,
            gaps: &[],
            robot_radius: RADIUS,
            attractive_speed: 0.25 * distance,
            distance_to_goal: distance,
            arrival_tolerance: 5.0,
            heading_error: 0.0,
            repulsion_slowdown: 1.0,
            trap_min_speed: 0.0,
            min_wheel_speed: 4.0,
            dt: 0.05,
        }
    }

    #[test]
    fn test_clear_when_nothing_ahead() {
        let governor = VelocityGovernor::default();
        let a = governor.assess(&frontal(80.0), RADIUS, &RampMemory::default());
        assert_eq!(a.level, SafetyLevel::Clear);
        assert!(a.frontal_distance.is_infinite());
    }

    #[test]
    fn test_brake_distance_uses_start_speed_when_idle() {
        let governor = VelocityGovernor::default();
        let a = governor.assess(&frontal(40.0), RADIUS, &RampMemory::default());
        assert_relative_eq!(a.brake_distance, 1.6);
        let moving = RampMemory { last_linear: 20.0 };
        let b = governor.assess(&frontal(40.0), RADIUS, &moving);
        assert_relative_eq!(b.brake_distance, 10.0);
    }

    #[test]
    fn test_safety_levels() {
        let governor = VelocityGovernor::default();
        let memory = RampMemory::default();
        let level = |d: f64| governor.assess(&frontal(d), RADIUS, &memory).level;

        // clearance 1.9 → emergency from the frontal clearance limit
        assert_eq!(level(19.0), SafetyLevel::Emergency);
        // effective 22.9 - 17.1 - 1.6 = 4.2 → still emergency
        assert_eq!(level(22.9), SafetyLevel::Emergency);
        // effective 27.0 - 17.1 - 1.6 = 8.3 → critical
        assert_eq!(level(27.0), SafetyLevel::Critical);
        // effective 38.0 - 17.1 - 1.6 = 19.3 → warning
        assert_eq!(level(38.0), SafetyLevel::Warning);
        // effective 26.3 → caution
        assert_eq!(level(45.0), SafetyLevel::Caution);
        assert_eq!(level(55.0), SafetyLevel::Clear);
    }

    #[test]
    fn test_ceiling_monotonic_in_clearance() {
        let governor = VelocityGovernor::default();
        let memory = RampMemory { last_linear: 15.0 };
        let mut previous = 0.0;
        for d in [18.0, 22.0, 26.0, 30.0, 38.0, 45.0, 52.0, 59.0] {
            let a = governor.assess(&frontal(d), RADIUS, &memory);
            assert!(a.ceiling >= previous, "ceiling dropped at {}", d);
            previous = a.ceiling;
        }
    }

    #[test]
    fn test_ceiling_never_rises_with_brake_distance() {
        let custom = GovernorConfig {
            tiers: vec![
                SafetyTier {
                    level: SafetyLevel::Critical,
                    effective_below: 25.0,
                    frontal: FrontalLimit::Distance(10.0),
                    ceiling: 12.0,
                },
                SafetyTier {
                    level: SafetyLevel::Caution,
                    effective_below: 40.0,
                    frontal: FrontalLimit::Clearance(5.0),
                    ceiling: 30.0,
                },
            ],
            ..GovernorConfig::default()
        };

        for config in [GovernorConfig::default(), custom] {
            let governor = VelocityGovernor::new(config);
            for d in [20.0, 30.0, 45.0, 59.0] {
                // Same frame each sweep; only the remembered speed grows
                let frame = frontal(d);
                let mut previous = governor.assess(&frame, RADIUS, &RampMemory::default());
                for last_linear in [8.0, 12.0, 16.0, 20.0, 25.0, 30.0, 38.0] {
                    let a = governor.assess(&frame, RADIUS, &RampMemory { last_linear });
                    assert_eq!(a.frontal_clearance, previous.frontal_clearance);
                    assert!(a.effective_clearance <= previous.effective_clearance);
                    assert!(
                        a.ceiling <= previous.ceiling,
                        "ceiling rose at d={} last={}",
                        d,
                        last_linear
                    );
                    previous = a;
                }
            }
        }

        // The sweep does move through tiers
        let governor = VelocityGovernor::default();
        let slow = governor.assess(&frontal(45.0), RADIUS, &RampMemory { last_linear: 8.0 });
        let fast = governor.assess(&frontal(45.0), RADIUS, &RampMemory { last_linear: 38.0 });
        assert_eq!(slow.level, SafetyLevel::Caution);
        assert_eq!(fast.level, SafetyLevel::Emergency);
    }

    #[test]
    fn test_gap_bonus() {
        let governor = VelocityGovernor::default();
        let gap = |width: f64| Gap {
            left: 1,
            right: 3,
            width,
            bearing: 0.0,
            navigable: true,
        };
        assert_relative_eq!(governor.gap_bonus(15.0, &[gap(70.0)], 34.0), 19.5, epsilon = 1e-12);
        assert_relative_eq!(governor.gap_bonus(15.0, &[gap(55.0)], 34.0), 17.25, epsilon = 1e-12);
        assert_eq!(governor.gap_bonus(15.0, &[gap(40.0)], 34.0), 15.0);
        assert_eq!(governor.gap_bonus(35.0, &[gap(90.0)], 34.0), 38.0);
        assert_eq!(governor.gap_bonus(15.0, &[], 34.0), 15.0);
    }

    #[test]
    fn test_ramp_limits_increase() {
        let governor = VelocityGovernor::default();
        let frame = frontal(80.0);
        let mut memory = RampMemory { last_linear: 20.0 };
        let governed = governor.govern(&inputs(&frame, 200.0), &mut memory);
        assert_relative_eq!(memory.last_linear, 20.5, epsilon = 1e-12);
        assert_relative_eq!(governed.linear, 20.5, epsilon = 1e-12);
    }

    #[test]
    fn test_ramp_starts_at_start_speed() {
        let governor = VelocityGovernor::default();
        let frame = frontal(80.0);
        let mut memory = RampMemory::default();
        let governed = governor.govern(&inputs(&frame, 200.0), &mut memory);
        assert_relative_eq!(memory.last_linear, 8.0);
        assert_relative_eq!(governed.linear, 8.0);
    }

    #[test]
    fn test_ceiling_caps_output() {
        let governor = VelocityGovernor::default();
        let frame = frontal(19.0);
        let mut memory = RampMemory { last_linear: 30.0 };
        let governed = governor.govern(&inputs(&frame, 200.0), &mut memory);
        assert_eq!(governed.assessment.level, SafetyLevel::Emergency);
        assert!(governed.linear <= 8.0);
    }

    #[test]
    fn test_heading_derate_and_floor() {
        let governor = VelocityGovernor::default();
        assert_eq!(governor.heading_floor(60.0), 0.6);
        assert_eq!(governor.heading_floor(30.0), 0.4);
        assert_eq!(governor.heading_floor(10.0), 0.2);

        let frame = frontal(80.0);
        let mut memory = RampMemory { last_linear: 20.0 };
        let mut i = inputs(&frame, 200.0);
        i.heading_error = std::f64::consts::PI;
        let governed = governor.govern(&i, &mut memory);
        assert_relative_eq!(governed.linear, 20.5 * 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_lateral_factor() {
        let governor = VelocityGovernor::default();
        assert_eq!(governor.lateral_factor(3.0), 0.4);
        assert_eq!(governor.lateral_factor(7.0), 0.65);
        assert_eq!(governor.lateral_factor(12.0), 0.8);
        assert_eq!(governor.lateral_factor(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_floors() {
        let governor = VelocityGovernor::default();
        let frame = frontal(80.0);

        // Trapped: at least the trap minimum even with no attraction
        let mut memory = RampMemory::default();
        let mut i = inputs(&frame, 3.0);
        i.attractive_speed = 0.0;
        i.trap_min_speed = 4.0;
        assert_relative_eq!(governor.govern(&i, &mut memory).linear, 4.0);

        // Outside tolerance: at least the arc minimum
        let mut i = inputs(&frame, 20.0);
        i.attractive_speed = 0.5;
        i.min_wheel_speed = 2.0;
        assert_relative_eq!(governor.govern(&i, &mut memory).linear, 2.0);
    }
}
