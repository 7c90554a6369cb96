//! Trap Detector
//!
//! Detects local minima where most sensors are blocked and no navigable gap
//! exists, and exposes the gain changes used to push out of them.

use super::gap::Gap;
use super::sensor_frame::SensorFrame;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapConfig {
    pub enabled: bool,
    /// Blocked sensors needed to trigger
    pub sensor_count: usize,
    pub blocked_threshold: f64,
    pub attractive_scale: f64,
    pub repulsive_scale: f64,
    pub angular_scale: f64,
    /// Forward speed guaranteed while trapped (cm/s)
    pub min_forward_speed: f64,
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sensor_count: 5,
            blocked_threshold: 100.0,
            attractive_scale: 0.3,
            repulsive_scale: 1.5,
            angular_scale: 1.5,
            min_forward_speed: 4.0,
        }
    }
}

/// Gain multipliers applied for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapGains {
    pub attractive: f64,
    pub repulsive: f64,
    pub angular: f64,
    pub min_forward_speed: f64,
}

impl TrapGains {
    pub fn neutral() -> Self {
        Self {
            attractive: 1.0,
            repulsive: 1.0,
            angular: 1.0,
            min_forward_speed: 0.0,
        }
    }
}

/// Trap status carried across ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrapState {
    pub trapped: bool,
    pub blocked_count: usize,
    /// Consecutive ticks spent trapped
    pub consecutive_ticks: u32,
    /// Number of times the trap has been entered
    pub episodes: u32,
}

/// Local-minimum detector
#[derive(Debug, Clone)]
pub struct TrapDetector {
    config: TrapConfig,
    state: TrapState,
}

impl TrapDetector {
    pub fn new(config: TrapConfig) -> Self {
        Self {
            config,
            state: TrapState::default(),
        }
    }

    /// Re-evaluate the trap condition for this tick
    ///
    /// Returns true on the tick the robot becomes trapped.
    pub fn update(&mut self, frame: &SensorFrame, gaps: &[Gap]) -> bool {
        let blocked = frame.blocked_count(self.config.blocked_threshold);
        let has_gap = gaps.iter().any(|g| g.navigable);
        let trapped = self.config.enabled && blocked >= self.config.sensor_count && !has_gap;

        let entered = trapped && !self.state.trapped;
        self.state.blocked_count = blocked;
        self.state.trapped = trapped;
        if trapped {
            self.state.consecutive_ticks += 1;
            if entered {
                self.state.episodes += 1;
            }
        } else {
            self.state.consecutive_ticks = 0;
        }
        entered
    }

    pub fn state(&self) -> &TrapState {
        &self.state
    }

    pub fn is_trapped(&self) -> bool {
        self.state.trapped
    }

    pub fn gains(&self) -> TrapGains {
        if self.state.trapped {
            TrapGains {
                attractive: self.config.attractive_scale,
                repulsive: self.config.repulsive_scale,
                angular: self.config.angular_scale,
                min_forward_speed: self.config.min_forward_speed,
            }
        } else {
            TrapGains::neutral()
        }
    }

    pub fn config(&self) -> &TrapConfig {
        &self.config
    }

    /// Forget the current trap, keeping the episode count
    pub fn clear(&mut self) {
        self.state.trapped = false;
        self.state.consecutive_ticks = 0;
    }
}

impl Default for TrapDetector {
    fn default() -> Self {
        Self::new(TrapConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::sensor_frame::{ProximityThresholds, SensorCalibration};
    use crate::messages::SENSOR_COUNT;

    fn frame_with(normalized: [f64; SENSOR_COUNT]) -> SensorFrame {
        let cal = SensorCalibration::default();
        let raw = std::array::from_fn(|i| normalized[i] * cal.factors[i]);
        SensorFrame::build(&cal, &ProximityThresholds::default(), &raw)
    }

    fn navigable_gap() -> Gap {
        Gap {
            left: 0,
            right: 2,
            width: 60.0,
            bearing: 0.0,
            navigable: true,
        }
    }

    #[test]
    fn test_triggers_on_five_blocked() {
        let mut detector = TrapDetector::default();
        let frame = frame_with([0.0, 150.0, 150.0, 150.0, 150.0, 150.0, 0.0]);
        assert!(detector.update(&frame, &[]));
        assert!(detector.is_trapped());
        assert_eq!(detector.state().blocked_count, 5);

        let gains = detector.gains();
        assert_eq!(gains.attractive, 0.3);
        assert_eq!(gains.repulsive, 1.5);
        assert_eq!(gains.min_forward_speed, 4.0);
    }

    #[test]
    fn test_counts_ticks_and_episodes() {
        let mut detector = TrapDetector::default();
        let blocked = frame_with([150.0; SENSOR_COUNT]);
        let open = frame_with([0.0; SENSOR_COUNT]);

        detector.update(&blocked, &[]);
        assert!(!detector.update(&blocked, &[]));
        assert_eq!(detector.state().consecutive_ticks, 2);

        detector.update(&open, &[]);
        assert!(!detector.is_trapped());
        assert_eq!(detector.state().consecutive_ticks, 0);
        assert_eq!(detector.gains(), TrapGains::neutral());

        detector.update(&blocked, &[]);
        assert_eq!(detector.state().episodes, 2);
    }

    #[test]
    fn test_navigable_gap_prevents_trap() {
        let mut detector = TrapDetector::default();
        let frame = frame_with([150.0; SENSOR_COUNT]);
        assert!(!detector.update(&frame, &[navigable_gap()]));
        assert!(!detector.is_trapped());
    }

    #[test]
    fn test_disabled() {
        let mut detector = TrapDetector::new(TrapConfig {
            enabled: false,
            ..TrapConfig::default()
        });
        let frame = frame_with([150.0; SENSOR_COUNT]);
        detector.update(&frame, &[]);
        assert!(!detector.is_trapped());
    }

    #[test]
    fn test_four_blocked_is_not_trapped() {
        let mut detector = TrapDetector::default();
        let frame = frame_with([150.0, 150.0, 150.0, 150.0, 0.0, 0.0, 0.0]);
        detector.update(&frame, &[]);
        assert!(!detector.is_trapped());
    }
}
