use super::cmd_vel::VelocityCommand;
use super::diagnostics::{DriveMode, Feedback, SafetyLevel};
use super::geometry::Pose2D;
use super::navigation::MissionState;
use fieldnav_core::core::LogSummary;
use serde::{Deserialize, Serialize};

/// Structured per-tick record handed to the telemetry collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub tick: u64,
    /// Elapsed time the tick was computed with (s)
    pub dt: f64,
    pub pose: Pose2D,
    pub goal_index: Option<usize>,
    pub distance_to_goal: f64,
    pub arrival_tolerance: f64,
    pub command: VelocityCommand,
    pub attractive_magnitude: f64,
    pub repulsive_magnitude: f64,
    pub weight_repulsive: f64,
    pub desired_heading: f64,
    pub goal_bearing: f64,
    pub attractive_gain_scale: f64,
    pub obstacle_count: usize,
    pub sensor_faults: usize,
    pub navigable_gaps: usize,
    pub safety_level: SafetyLevel,
    pub speed_ceiling: f64,
    pub trapped: bool,
    pub halted: bool,
    pub collisions: u32,
    pub mode: DriveMode,
    pub feedback: Feedback,
    pub state: MissionState,
    /// World-frame obstacle estimates from detecting sensors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obstacles: Vec<[f64; 2]>,
}

impl TickRecord {
    /// Record for a tick that produced no navigation output
    pub fn idle(tick: u64, pose: Pose2D, state: MissionState, mode: DriveMode) -> Self {
        Self {
            tick,
            dt: 0.0,
            pose,
            goal_index: state.active_waypoint(),
            distance_to_goal: 0.0,
            arrival_tolerance: 0.0,
            command: VelocityCommand::zero(),
            attractive_magnitude: 0.0,
            repulsive_magnitude: 0.0,
            weight_repulsive: 0.0,
            desired_heading: pose.theta,
            goal_bearing: pose.theta,
            attractive_gain_scale: 1.0,
            obstacle_count: 0,
            sensor_faults: 0,
            navigable_gaps: 0,
            safety_level: SafetyLevel::Clear,
            speed_ceiling: 0.0,
            trapped: false,
            halted: false,
            collisions: 0,
            mode,
            feedback: Feedback::Idle,
            state,
            obstacles: Vec::new(),
        }
    }
}

impl LogSummary for TickRecord {
    fn log_summary(&self) -> String {
        format!(
            "#{} {} pose=({:.1},{:.1},{:.2}) d={:.1} v=({:.1},{:.1}) {} rep={:.2} obs={}{}",
            self.tick,
            self.state,
            self.pose.x,
            self.pose.y,
            self.pose.theta,
            self.distance_to_goal,
            self.command.v_left,
            self.command.v_right,
            self.safety_level,
            self.weight_repulsive,
            self.obstacle_count,
            if self.trapped { " TRAPPED" } else { "" }
        )
    }
}
