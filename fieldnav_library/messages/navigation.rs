use super::geometry::{Pose2D, Waypoint};
use fieldnav_core::error::{NavError, NavResult};
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_arrival_tolerance() -> f64 {
    5.0
}

/// Ordered waypoints handed over by the path planner before mission start
///
/// The plan is immutable once validated; progress lives in the sequencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionPlan {
    /// World pose of the robot when the mission starts
    #[serde(default)]
    pub initial_pose: Pose2D,
    pub waypoints: Vec<Waypoint>,
    /// Base arrival radius in cm, widened by the sequencer as drift builds up
    #[serde(default = "default_arrival_tolerance")]
    pub arrival_tolerance: f64,
    /// Index of the first waypoint to seek, for resumed missions
    #[serde(default)]
    pub first_waypoint: usize,
}

impl MissionPlan {
    pub fn new(initial_pose: Pose2D, waypoints: Vec<Waypoint>) -> Self {
        Self {
            initial_pose,
            waypoints,
            arrival_tolerance: default_arrival_tolerance(),
            first_waypoint: 0,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.arrival_tolerance = tolerance;
        self
    }

    pub fn starting_at(mut self, index: usize) -> Self {
        self.first_waypoint = index;
        self
    }

    /// Load a plan from a YAML, TOML or JSON file and validate it
    pub fn load(path: &std::path::Path) -> NavResult<Self> {
        let plan: MissionPlan = fieldnav_core::params::load(path)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn final_goal(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    /// Reject plans that cannot be flown
    pub fn validate(&self) -> NavResult<()> {
        let len = self.waypoints.len();
        if len == 0 {
            return Err(NavError::DegenerateMission("no waypoints".to_string()));
        }
        if !self.initial_pose.is_finite() {
            return Err(NavError::Config("initial pose is not finite".to_string()));
        }
        if !(self.arrival_tolerance.is_finite() && self.arrival_tolerance > 0.0) {
            return Err(NavError::Config(format!(
                "arrival tolerance must be positive, got {}",
                self.arrival_tolerance
            )));
        }
        if self.first_waypoint >= len {
            return Err(NavError::InvalidWaypoint {
                index: self.first_waypoint,
                len,
                reason: "first waypoint index out of range".to_string(),
            });
        }
        for (index, waypoint) in self.waypoints.iter().enumerate() {
            if !waypoint.is_finite() {
                return Err(NavError::InvalidWaypoint {
                    index,
                    len,
                    reason: format!("non-finite coordinates ({}, {})", waypoint.x, waypoint.y),
                });
            }
        }

        let remaining = &self.waypoints[self.first_waypoint..];
        if remaining
            .iter()
            .all(|waypoint| self.initial_pose.distance_to(waypoint) < self.arrival_tolerance)
        {
            return Err(NavError::DegenerateMission(format!(
                "start ({:.1}, {:.1}) already within {:.1} cm of every goal",
                self.initial_pose.x, self.initial_pose.y, self.arrival_tolerance
            )));
        }
        Ok(())
    }
}

/// Why a mission ended early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    Cancelled,
    CollisionLimit,
    SafetyHalt,
    HardwareFault,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AbortReason::Cancelled => "cancelled",
            AbortReason::CollisionLimit => "collision limit reached",
            AbortReason::SafetyHalt => "safety halt persisted",
            AbortReason::HardwareFault => "hardware fault",
        };
        f.write_str(text)
    }
}

/// Mission state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionState {
    /// Driving toward waypoint `i`
    Seeking(usize),
    /// Reached waypoint `i`, settling before the next one
    Arrived(usize),
    Done,
    Aborted(AbortReason),
}

impl MissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MissionState::Done | MissionState::Aborted(_))
    }

    /// Waypoint currently being sought, if any
    pub fn active_waypoint(&self) -> Option<usize> {
        match self {
            MissionState::Seeking(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for MissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionState::Seeking(i) => write!(f, "SEEKING({})", i),
            MissionState::Arrived(i) => write!(f, "ARRIVED({})", i),
            MissionState::Done => write!(f, "DONE"),
            MissionState::Aborted(reason) => write!(f, "ABORTED ({})", reason),
        }
    }
}

/// Terminal or running summary of a mission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionReport {
    pub state: MissionState,
    pub last_pose: Pose2D,
    pub ticks: u64,
    pub collisions: u32,
    pub stalls: u32,
    pub trap_episodes: u32,
    pub waypoints_reached: usize,
    pub distance_traveled: f64,
}

impl MissionReport {
    pub fn new(state: MissionState, last_pose: Pose2D) -> Self {
        Self {
            state,
            last_pose,
            ticks: 0,
            collisions: 0,
            stalls: 0,
            trap_episodes: 0,
            waypoints_reached: 0,
            distance_traveled: 0.0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == MissionState::Done
    }
}
