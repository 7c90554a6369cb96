//! Waypoint Sequencer
//!
//! Mission state machine over an ordered list of waypoints.
//!
//! # Features
//!
//! - Arrival tolerance that widens with distance travelled (odometry drift)
//! - Optional settle pause between waypoints
//! - Bounded fine approach onto the final waypoint when the widened
//!   tolerance lets the robot stop short of it
//! - Monotonic progress: the active index never decreases
//!
//! # Example
//!
//! ```rust
//! use fieldnav_library::algorithms::waypoint_sequencer::{SequencerConfig, Transition, WaypointSequencer};
//! use fieldnav_library::messages::{MissionPlan, MissionState, Pose2D, Waypoint};
//!
//! let plan = MissionPlan::new(Pose2D::origin(), vec![Waypoint::new(100.0, 0.0)]);
//! let mut sequencer = WaypointSequencer::new(&plan, SequencerConfig::default());
//!
//! assert_eq!(sequencer.update(&Pose2D::new(50.0, 0.0, 0.0), 50.0), Transition::Stay);
//! assert_eq!(sequencer.update(&Pose2D::new(98.0, 0.0, 0.0), 98.0), Transition::Completed(0));
//! assert_eq!(sequencer.state(), MissionState::Done);
//! ```

use crate::messages::{AbortReason, MissionPlan, MissionState, Pose2D, Waypoint};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Tolerance growth per centimetre travelled
    pub drift_per_cm: f64,
    /// Upper bound for the widened tolerance (cm)
    pub max_tolerance: f64,
    /// Ticks to hold still after reaching an intermediate waypoint
    pub settle_ticks: u32,
    /// Bumper contacts tolerated before aborting
    pub max_collisions: u32,
    /// Abort after this many consecutive halted ticks, never when unset
    pub halt_abort_ticks: Option<u64>,
    pub fine_approach: FineApproachConfig,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            drift_per_cm: 0.002,
            max_tolerance: 8.0,
            settle_ticks: 0,
            max_collisions: 3,
            halt_abort_ticks: None,
            fine_approach: FineApproachConfig::default(),
        }
    }
}

/// Slow direct creep onto the final waypoint
///
/// Runs once the robot is inside the widened arrival tolerance but still
/// further than `finish_distance` from the goal. It ends at
/// `finish_distance`, when the distance stops shrinking, or after
/// `max_ticks`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FineApproachConfig {
    pub enabled: bool,
    pub finish_distance: f64,
    pub min_speed: f64,
    /// Linear speed per cm of remaining distance (1/s)
    pub speed_gain: f64,
    /// Angular rate per radian of bearing error (1/s)
    pub angular_gain: f64,
    pub max_ticks: u32,
}

impl Default for FineApproachConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            finish_distance: 2.0,
            min_speed: 2.0,
            speed_gain: 0.6,
            angular_gain: 0.8,
            max_ticks: 40,
        }
    }
}

impl FineApproachConfig {
    /// Linear speed and angular rate toward a goal `distance` away at
    /// `bearing_error` radians off the heading
    pub fn command(&self, distance: f64, bearing_error: f64) -> (f64, f64) {
        (
            (self.speed_gain * distance).max(self.min_speed),
            self.angular_gain * bearing_error,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ApproachProgress {
    ticks: u32,
    best: f64,
}

/// State change produced by one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    /// Waypoint reached, settling before the next one
    Arrived(usize),
    /// Now seeking waypoint `to`
    Advanced { from: usize, to: usize },
    /// Inside the tolerance of the final waypoint, creeping closer
    Approaching(usize),
    /// Final waypoint reached
    Completed(usize),
}

#[derive(Debug, Clone)]
pub struct WaypointSequencer {
    waypoints: Vec<Waypoint>,
    base_tolerance: f64,
    config: SequencerConfig,
    state: MissionState,
    settle_remaining: u32,
    approach: Option<ApproachProgress>,
    reached: usize,
}

impl WaypointSequencer {
    /// Start seeking the plan's first waypoint; the plan must be validated
    pub fn new(plan: &MissionPlan, config: SequencerConfig) -> Self {
        Self {
            waypoints: plan.waypoints.clone(),
            base_tolerance: plan.arrival_tolerance,
            config,
            state: MissionState::Seeking(plan.first_waypoint),
            settle_remaining: 0,
            approach: None,
            reached: 0,
        }
    }

    pub fn state(&self) -> MissionState {
        self.state
    }

    pub fn waypoints_reached(&self) -> usize {
        self.reached
    }

    /// Index of the waypoint being sought or settled at
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            MissionState::Seeking(i) | MissionState::Arrived(i) => Some(i),
            _ => None,
        }
    }

    /// Waypoint being driven toward
    pub fn active_waypoint(&self) -> Option<&Waypoint> {
        self.state.active_waypoint().and_then(|i| self.waypoints.get(i))
    }

    /// Arrival radius after `traveled` cm of motion
    pub fn tolerance(&self, traveled: f64) -> f64 {
        let cap = self.config.max_tolerance.max(self.base_tolerance);
        (self.base_tolerance + traveled.max(0.0) * self.config.drift_per_cm).min(cap)
    }

    pub fn is_approaching(&self) -> bool {
        self.approach.is_some()
    }

    pub fn is_settling(&self) -> bool {
        matches!(self.state, MissionState::Arrived(_))
    }

    /// Advance the state machine with the current world pose
    pub fn update(&mut self, pose: &Pose2D, traveled: f64) -> Transition {
        match self.state {
            MissionState::Seeking(i) => {
                let Some(goal) = self.waypoints.get(i) else {
                    self.state = MissionState::Done;
                    return Transition::Completed(i);
                };
                let distance = pose.distance_to(goal);
                if distance >= self.tolerance(traveled) {
                    self.approach = None;
                    return Transition::Stay;
                }
                let is_final = i + 1 >= self.waypoints.len();
                if is_final && !self.approach_finished(distance) {
                    return Transition::Approaching(i);
                }
                self.approach = None;
                self.reached += 1;
                if is_final {
                    self.state = MissionState::Done;
                    Transition::Completed(i)
                } else if self.config.settle_ticks > 0 {
                    self.state = MissionState::Arrived(i);
                    self.settle_remaining = self.config.settle_ticks;
                    Transition::Arrived(i)
                } else {
                    self.state = MissionState::Seeking(i + 1);
                    Transition::Advanced { from: i, to: i + 1 }
                }
            }
            MissionState::Arrived(i) => {
                self.settle_remaining = self.settle_remaining.saturating_sub(1);
                if self.settle_remaining == 0 {
                    self.state = MissionState::Seeking(i + 1);
                    Transition::Advanced { from: i, to: i + 1 }
                } else {
                    Transition::Stay
                }
            }
            MissionState::Done | MissionState::Aborted(_) => Transition::Stay,
        }
    }

    /// Track the fine approach; true once the final waypoint counts as reached
    fn approach_finished(&mut self, distance: f64) -> bool {
        let config = self.config.fine_approach;
        if !config.enabled || distance <= config.finish_distance {
            return true;
        }
        match self.approach.as_mut() {
            None => {
                self.approach = Some(ApproachProgress {
                    ticks: 0,
                    best: distance,
                });
                false
            }
            Some(progress) => {
                progress.ticks += 1;
                let finished = distance > progress.best || progress.ticks >= config.max_ticks;
                progress.best = progress.best.min(distance);
                finished
            }
        }
    }

    /// Move to `Aborted` unless already terminal
    pub fn abort(&mut self, reason: AbortReason) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = MissionState::Aborted(reason);
        self.approach = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_leg_plan() -> MissionPlan {
        MissionPlan::new(
            Pose2D::origin(),
            vec![Waypoint::new(100.0, 0.0), Waypoint::new(100.0, 100.0)],
        )
    }

    #[test]
    fn test_adaptive_tolerance() {
        let s = WaypointSequencer::new(&two_leg_plan(), SequencerConfig::default());
        assert_relative_eq!(s.tolerance(0.0), 5.0);
        assert_relative_eq!(s.tolerance(500.0), 6.0, epsilon = 1e-12);
        assert_relative_eq!(s.tolerance(5000.0), 8.0);
    }

    #[test]
    fn test_tolerance_never_below_base() {
        let plan = two_leg_plan().with_tolerance(12.0);
        let s = WaypointSequencer::new(&plan, SequencerConfig::default());
        assert_relative_eq!(s.tolerance(10_000.0), 12.0);
    }

    #[test]
    fn test_direct_advance_without_settle() {
        let mut s = WaypointSequencer::new(&two_leg_plan(), SequencerConfig::default());
        let at_first = Pose2D::new(97.0, 1.0, 0.0);
        assert_eq!(s.update(&at_first, 97.0), Transition::Advanced { from: 0, to: 1 });
        assert_eq!(s.state(), MissionState::Seeking(1));
        assert_eq!(s.active_waypoint(), Some(&Waypoint::new(100.0, 100.0)));
    }

    #[test]
    fn test_arrival_is_idempotent() {
        let mut s = WaypointSequencer::new(&two_leg_plan(), SequencerConfig::default());
        let at_first = Pose2D::new(99.0, 0.0, 0.0);
        s.update(&at_first, 99.0);
        for _ in 0..10 {
            assert_eq!(s.update(&at_first, 99.0), Transition::Stay);
            assert_eq!(s.state(), MissionState::Seeking(1));
        }
        assert_eq!(s.waypoints_reached(), 1);
    }

    #[test]
    fn test_settle_pause() {
        let config = SequencerConfig {
            settle_ticks: 3,
            ..SequencerConfig::default()
        };
        let mut s = WaypointSequencer::new(&two_leg_plan(), config);
        let at_first = Pose2D::new(100.0, 0.0, 0.0);

        assert_eq!(s.update(&at_first, 100.0), Transition::Arrived(0));
        assert!(s.is_settling());
        assert_eq!(s.current_index(), Some(0));
        assert!(s.active_waypoint().is_none());
        assert_eq!(s.update(&at_first, 100.0), Transition::Stay);
        assert_eq!(s.update(&at_first, 100.0), Transition::Stay);
        assert_eq!(s.update(&at_first, 100.0), Transition::Advanced { from: 0, to: 1 });
    }

    #[test]
    fn test_completion_and_abort() {
        let mut s = WaypointSequencer::new(&two_leg_plan(), SequencerConfig::default());
        s.update(&Pose2D::new(100.0, 0.0, 0.0), 100.0);
        assert_eq!(
            s.update(&Pose2D::new(100.0, 99.0, 0.0), 200.0),
            Transition::Completed(1)
        );
        assert_eq!(s.state(), MissionState::Done);
        assert!(!s.abort(AbortReason::Cancelled));
        assert_eq!(s.state(), MissionState::Done);
    }

    fn one_leg_plan() -> MissionPlan {
        MissionPlan::new(Pose2D::origin(), vec![Waypoint::new(100.0, 0.0)])
    }

    #[test]
    fn test_widened_tolerance_starts_fine_approach_on_final_waypoint() {
        let mut s = WaypointSequencer::new(&one_leg_plan(), SequencerConfig::default());
        // 5.1 cm out is inside the 5.19 cm tolerance after 95 cm of travel
        assert_eq!(
            s.update(&Pose2D::new(94.9, 0.0, 0.0), 95.0),
            Transition::Approaching(0)
        );
        assert!(s.is_approaching());
        assert_eq!(s.state(), MissionState::Seeking(0));
        assert_eq!(s.waypoints_reached(), 0);

        assert_eq!(
            s.update(&Pose2D::new(96.0, 0.0, 0.0), 96.0),
            Transition::Approaching(0)
        );
        assert_eq!(
            s.update(&Pose2D::new(98.5, 0.0, 0.0), 98.5),
            Transition::Completed(0)
        );
        assert_eq!(s.state(), MissionState::Done);
        assert!(!s.is_approaching());
        assert_eq!(s.waypoints_reached(), 1);
    }

    #[test]
    fn test_fine_approach_is_bounded() {
        let config = SequencerConfig {
            fine_approach: FineApproachConfig {
                max_ticks: 3,
                ..FineApproachConfig::default()
            },
            ..SequencerConfig::default()
        };
        let mut s = WaypointSequencer::new(&one_leg_plan(), config);
        let mut x = 95.5;
        let mut transitions = Vec::new();
        for _ in 0..4 {
            transitions.push(s.update(&Pose2D::new(x, 0.0, 0.0), x));
            x += 0.1;
        }
        assert_eq!(transitions[..3], [Transition::Approaching(0); 3]);
        assert_eq!(transitions[3], Transition::Completed(0));

        // Moving away ends the approach at once
        let mut s = WaypointSequencer::new(&one_leg_plan(), SequencerConfig::default());
        s.update(&Pose2D::new(96.0, 0.0, 0.0), 96.0);
        assert_eq!(
            s.update(&Pose2D::new(95.8, 0.0, 0.0), 96.2),
            Transition::Completed(0)
        );
    }

    #[test]
    fn test_leaving_tolerance_cancels_fine_approach() {
        let mut s = WaypointSequencer::new(&one_leg_plan(), SequencerConfig::default());
        s.update(&Pose2D::new(96.0, 0.0, 0.0), 96.0);
        assert!(s.is_approaching());
        assert_eq!(s.update(&Pose2D::new(90.0, 0.0, 0.0), 102.0), Transition::Stay);
        assert!(!s.is_approaching());
        assert_eq!(s.state(), MissionState::Seeking(0));
    }

    #[test]
    fn test_disabled_fine_approach_completes_inside_tolerance() {
        let config = SequencerConfig {
            fine_approach: FineApproachConfig {
                enabled: false,
                ..FineApproachConfig::default()
            },
            ..SequencerConfig::default()
        };
        let mut s = WaypointSequencer::new(&one_leg_plan(), config);
        assert_eq!(
            s.update(&Pose2D::new(95.5, 0.0, 0.0), 95.5),
            Transition::Completed(0)
        );
    }

    #[test]
    fn test_fine_approach_command() {
        let approach = FineApproachConfig::default();
        let (v, omega) = approach.command(4.0, 0.5);
        assert_relative_eq!(v, 2.4, epsilon = 1e-12);
        assert_relative_eq!(omega, 0.4, epsilon = 1e-12);
        // Never slower than the creep speed
        assert_relative_eq!(approach.command(2.5, 0.0).0, 2.0);
    }

    #[test]
    fn test_resume_from_later_waypoint() {
        let plan = two_leg_plan().starting_at(1);
        let mut s = WaypointSequencer::new(&plan, SequencerConfig::default());
        // Passing the first waypoint does not count
        assert_eq!(s.update(&Pose2D::new(100.0, 0.0, 0.0), 100.0), Transition::Stay);
        assert!(s.abort(AbortReason::CollisionLimit));
        assert_eq!(s.state(), MissionState::Aborted(AbortReason::CollisionLimit));
    }
}
