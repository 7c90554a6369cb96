//! Control Loop
//!
//! One synchronous step per control tick: odometry in, wheel command,
//! advisory feedback and telemetry record out.
//!
//! The loop owns all cross-tick state (pose transform, ramp memory, trap
//! state, recovery maneuver, mission progress). Nothing here blocks or
//! sleeps, so it runs the same under the scheduler, the simulator or a
//! test harness.
//!
//! # Example
//!
//! ```rust
//! use fieldnav_library::config::NavConfig;
//! use fieldnav_library::messages::{BumperState, MissionPlan, MissionState, Pose2D, Waypoint};
//! use fieldnav_library::nodes::control_loop::{ControlLoop, TickInputs};
//!
//! let plan = MissionPlan::new(Pose2D::origin(), vec![Waypoint::new(100.0, 0.0)]);
//! let mut control = ControlLoop::new(NavConfig::default(), plan).unwrap();
//!
//! let output = control
//!     .step(&TickInputs {
//!         raw_pose: Pose2D::origin(),
//!         proximity: [0.0; 7],
//!         bumpers: BumperState::released(),
//!         dt: 0.05,
//!         halted: false,
//!     })
//!     .unwrap();
//!
//! assert_eq!(output.state, MissionState::Seeking(0));
//! assert!(output.command.v_left > 0.0);
//! ```

use crate::algorithms::attractive_field::attract;
use crate::algorithms::differential_drive::DifferentialDrive;
use crate::algorithms::force_combiner::{combine, lateral_guard};
use crate::algorithms::gap::detect_gaps;
use crate::algorithms::recovery::{Maneuver, ProgressMonitor};
use crate::algorithms::repulsive_field::{repel, RepulsionContext};
use crate::algorithms::sensor_frame::SensorFrame;
use crate::algorithms::trap_detector::TrapDetector;
use crate::algorithms::velocity_governor::{GovernorInputs, RampMemory, RampPolicy, VelocityGovernor};
use crate::algorithms::waypoint_sequencer::{Transition, WaypointSequencer};
use crate::config::NavConfig;
use crate::messages::{
    wrap_angle, AbortReason, BumperState, DriveMode, Feedback, MissionPlan, MissionReport,
    MissionState, Pose2D, ProximityScan, TickRecord, VelocityCommand, Waypoint,
};
use fieldnav_core::error::{NavError, NavResult};
use tracing::{debug, info, warn};

/// Raw inputs for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInputs {
    /// Pose as reported by the drive's odometry
    pub raw_pose: Pose2D,
    pub proximity: ProximityScan,
    pub bumpers: BumperState,
    /// Elapsed time since the previous tick (s)
    pub dt: f64,
    pub halted: bool,
}

/// Everything produced by one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub command: VelocityCommand,
    pub feedback: Feedback,
    pub state: MissionState,
    pub record: TickRecord,
}

/// Rigid transform from odometry frame to world frame
///
/// Fixed on the first tick so the raw start pose maps onto the plan's
/// initial pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseTransform {
    raw_origin: Pose2D,
    world_origin: Pose2D,
    rotation: f64,
}

impl PoseTransform {
    pub fn new(world_origin: Pose2D, raw_origin: Pose2D) -> Self {
        Self {
            raw_origin,
            world_origin,
            rotation: wrap_angle(world_origin.theta - raw_origin.theta),
        }
    }

    pub fn apply(&self, raw: &Pose2D) -> Pose2D {
        let dx = raw.x - self.raw_origin.x;
        let dy = raw.y - self.raw_origin.y;
        let (sin, cos) = self.rotation.sin_cos();
        Pose2D {
            x: self.world_origin.x + cos * dx - sin * dy,
            y: self.world_origin.y + sin * dx + cos * dy,
            theta: wrap_angle(raw.theta + self.rotation),
        }
    }
}

/// Potential-field navigation control loop
pub struct ControlLoop {
    config: NavConfig,
    drive: DifferentialDrive,
    governor: VelocityGovernor,
    sequencer: WaypointSequencer,
    trap: TrapDetector,
    progress: ProgressMonitor,
    maneuver: Option<Maneuver>,
    ramp: RampMemory,
    transform: Option<PoseTransform>,
    pose: Pose2D,
    last_pose: Option<Pose2D>,
    traveled: f64,
    tick: u64,
    collisions: u32,
    stalls: u32,
    halted_ticks: u64,
}

impl ControlLoop {
    /// Validate configuration and plan, then prepare the first tick
    pub fn new(config: NavConfig, plan: MissionPlan) -> NavResult<Self> {
        config.validate()?;
        plan.validate()?;

        Ok(Self {
            drive: config.robot.drive(),
            governor: VelocityGovernor::new(config.governor.clone()),
            sequencer: WaypointSequencer::new(&plan, config.mission),
            trap: TrapDetector::new(config.trap),
            progress: ProgressMonitor::new(&config.recovery),
            maneuver: None,
            ramp: RampMemory::default(),
            transform: None,
            pose: plan.initial_pose,
            last_pose: None,
            traveled: 0.0,
            tick: 0,
            collisions: 0,
            stalls: 0,
            halted_ticks: 0,
            config,
        })
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn state(&self) -> MissionState {
        self.sequencer.state()
    }

    pub fn is_finished(&self) -> bool {
        self.sequencer.state().is_terminal()
    }

    /// Last world-frame pose
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    pub fn ramp(&self) -> &RampMemory {
        &self.ramp
    }

    pub fn distance_traveled(&self) -> f64 {
        self.traveled
    }

    pub fn collisions(&self) -> u32 {
        self.collisions
    }

    /// End the mission early; no effect once terminal
    pub fn abort(&mut self, reason: AbortReason) -> bool {
        let aborted = self.sequencer.abort(reason);
        if aborted {
            self.maneuver = None;
            self.ramp.reset();
            warn!(%reason, tick = self.tick, "mission aborted");
        }
        aborted
    }

    pub fn report(&self) -> MissionReport {
        MissionReport {
            state: self.sequencer.state(),
            last_pose: self.pose,
            ticks: self.tick,
            collisions: self.collisions,
            stalls: self.stalls,
            trap_episodes: self.trap.state().episodes,
            waypoints_reached: self.sequencer.waypoints_reached(),
            distance_traveled: self.traveled,
        }
    }

    /// Run one control tick
    ///
    /// Fails only on unusable odometry; the caller treats that as a
    /// hardware fault.
    pub fn step(&mut self, inputs: &TickInputs) -> NavResult<TickOutput> {
        if !inputs.raw_pose.is_finite() {
            return Err(NavError::hardware(format!(
                "non-finite odometry ({}, {}, {})",
                inputs.raw_pose.x, inputs.raw_pose.y, inputs.raw_pose.theta
            )));
        }
        self.tick += 1;
        let dt = if inputs.dt.is_finite() && inputs.dt > 0.0 {
            inputs.dt
        } else {
            self.config.control.dt
        };

        let mut output = self.advance(inputs, dt)?;
        output.record.dt = dt;
        Ok(output)
    }

    fn advance(&mut self, inputs: &TickInputs, dt: f64) -> NavResult<TickOutput> {
        self.update_pose(&inputs.raw_pose);

        if self.is_finished() {
            return Ok(self.idle(DriveMode::Stopped, None));
        }

        if inputs.halted {
            return Ok(self.halted());
        }
        self.halted_ticks = 0;

        let frame = SensorFrame::build(&self.config.sensors, &self.config.thresholds, &inputs.proximity);

        if inputs.bumpers.any() {
            return Ok(self.collision(&frame));
        }

        if let Some(output) = self.run_maneuver(dt, &frame) {
            return Ok(output);
        }

        match self.sequencer.update(&self.pose, self.traveled) {
            Transition::Stay => {}
            Transition::Approaching(i) => {
                if let Some(goal) = self.sequencer.active_waypoint().copied() {
                    return Ok(self.fine_approach(&frame, i, &goal));
                }
            }
            Transition::Arrived(i) => {
                info!(waypoint = i, tick = self.tick, "waypoint reached, settling");
            }
            Transition::Advanced { from, to } => {
                info!(waypoint = from, next = to, tick = self.tick, "waypoint reached");
                self.progress.reset();
                self.trap.clear();
                if self.config.governor.ramp_policy == RampPolicy::ResetPerWaypoint {
                    self.ramp.reset();
                }
            }
            Transition::Completed(i) => {
                info!(
                    waypoint = i,
                    tick = self.tick,
                    traveled = self.traveled,
                    "final waypoint reached, mission done"
                );
                self.ramp.reset();
                return Ok(self.idle(DriveMode::Stopped, Some(&frame)));
            }
        }

        if self.sequencer.is_settling() {
            return Ok(self.idle(DriveMode::Settle, Some(&frame)));
        }

        let (index, goal) = match (self.sequencer.state(), self.sequencer.active_waypoint()) {
            (MissionState::Seeking(i), Some(goal)) => (i, *goal),
            _ => return Ok(self.idle(DriveMode::Stopped, Some(&frame))),
        };

        let output = self.navigate(&frame, index, &goal, dt);
        self.check_progress(&frame, output.record.distance_to_goal, &goal, dt);
        Ok(output)
    }

    fn update_pose(&mut self, raw: &Pose2D) {
        let transform = *self
            .transform
            .get_or_insert_with(|| PoseTransform::new(self.pose, *raw));
        let pose = transform.apply(raw);
        if let Some(last) = self.last_pose {
            self.traveled += last.planar_distance(&pose);
        }
        self.last_pose = Some(pose);
        self.pose = pose;
    }

    fn halted(&mut self) -> TickOutput {
        self.halted_ticks += 1;
        self.ramp.reset();
        if self.halted_ticks == 1 {
            warn!(tick = self.tick, "halt asserted, holding still");
        }
        if let Some(limit) = self.config.mission.halt_abort_ticks {
            if self.halted_ticks > limit {
                self.abort(AbortReason::SafetyHalt);
                return self.idle(DriveMode::Stopped, None);
            }
        }
        let mut output = self.idle(DriveMode::Halted, None);
        output.record.halted = true;
        output
    }

    fn collision(&mut self, frame: &SensorFrame) -> TickOutput {
        self.collisions += 1;
        warn!(
            collisions = self.collisions,
            limit = self.config.mission.max_collisions,
            tick = self.tick,
            "bumper contact"
        );
        self.ramp.reset();
        self.progress.reset();
        if self.collisions >= self.config.mission.max_collisions {
            self.abort(AbortReason::CollisionLimit);
            return self.idle(DriveMode::Stopped, Some(frame));
        }
        self.maneuver = Some(Maneuver::collision_backoff(&self.config.recovery));
        self.idle(DriveMode::CollisionBackoff, Some(frame))
    }

    fn run_maneuver(&mut self, dt: f64, frame: &SensorFrame) -> Option<TickOutput> {
        let maneuver = self.maneuver.as_mut()?;
        let kind = maneuver.kind();
        match maneuver.advance(dt) {
            Some((left, right)) => {
                let (left, right) = self.drive.saturate_wheel_speeds(left, right);
                let mut output = self.idle(kind.mode(), Some(frame));
                output.command = VelocityCommand::from_wheels(left, right, self.drive.half_base());
                output.record.command = output.command;
                Some(output)
            }
            None => {
                debug!(tick = self.tick, "recovery maneuver finished");
                self.maneuver = None;
                self.progress.reset();
                None
            }
        }
    }

    fn navigate(&mut self, frame: &SensorFrame, index: usize, goal: &Waypoint, dt: f64) -> TickOutput {
        let config = &self.config;
        let pose = self.pose;
        let tolerance = self.sequencer.tolerance(self.traveled);

        let gaps = detect_gaps(frame, &config.gap, config.robot.diameter(), pose.theta);
        let was_trapped = self.trap.is_trapped();
        if self.trap.update(frame, &gaps) {
            info!(
                blocked = self.trap.state().blocked_count,
                episode = self.trap.state().episodes,
                "trapped in local minimum"
            );
        } else if was_trapped && !self.trap.is_trapped() {
            info!(ticks = self.tick, "trap cleared");
        }
        let gains = self.trap.gains();

        let attraction = attract(&config.attractive, &pose, goal, tolerance, gains.attractive);
        let repulsion = repel(
            &config.repulsive,
            &config.thresholds,
            frame,
            &RepulsionContext {
                robot_radius: config.robot.radius,
                heading: pose.theta,
                gain_scale: gains.repulsive,
                gaps: &gaps,
                gap_scale: config.gap.repulsion_scale,
            },
        );
        let blend = combine(&config.combiner, attraction.bearing, &repulsion.total);

        let heading_error = lateral_guard(
            wrap_angle(blend.heading - pose.theta),
            frame,
            &config.thresholds,
        );
        let distance = attraction.distance;
        let min_wheel_speed = config.steering.min_wheel_speed(distance);

        let governed = self.governor.govern(
            &GovernorInputs {
                frame,
                gaps: &gaps,
                robot_radius: config.robot.radius,
                attractive_speed: attraction.magnitude,
                distance_to_goal: distance,
                arrival_tolerance: tolerance,
                heading_error,
                repulsion_slowdown: blend.slowdown,
                trap_min_speed: gains.min_forward_speed,
                min_wheel_speed,
                dt,
            },
            &mut self.ramp,
        );

        let gain = config.steering.angular_gain(
            frame,
            &config.thresholds,
            self.trap.is_trapped().then_some(gains.angular),
            distance,
        );
        let arc = (distance > tolerance).then_some(min_wheel_speed);
        let command = self.drive.map(governed.linear, heading_error, gain, arc);

        let feedback = if frame.obstacle_count() > 0
            && frame.max_normalized() >= config.thresholds.caution
        {
            Feedback::Avoiding
        } else {
            Feedback::Seeking
        };

        let state = self.sequencer.state();
        let record = TickRecord {
            tick: self.tick,
            dt,
            pose,
            goal_index: Some(index),
            distance_to_goal: distance,
            arrival_tolerance: tolerance,
            command,
            attractive_magnitude: attraction.magnitude,
            repulsive_magnitude: repulsion.magnitude(),
            weight_repulsive: blend.weight_rep,
            desired_heading: blend.heading,
            goal_bearing: attraction.bearing,
            attractive_gain_scale: gains.attractive,
            obstacle_count: frame.obstacle_count(),
            sensor_faults: frame.fault_count(),
            navigable_gaps: gaps.iter().filter(|g| g.navigable).count(),
            safety_level: governed.assessment.level,
            speed_ceiling: governed.assessment.ceiling,
            trapped: self.trap.is_trapped(),
            halted: false,
            collisions: self.collisions,
            mode: DriveMode::Navigate,
            feedback,
            state,
            obstacles: frame.obstacle_points(&pose),
        };

        debug!(
            tick = self.tick,
            d = distance,
            level = %governed.assessment.level,
            v = governed.linear,
            omega = command.omega,
            w_rep = blend.weight_rep,
            "navigate"
        );

        TickOutput {
            command,
            feedback,
            state,
            record,
        }
    }

    /// Direct creep onto the final waypoint, ignoring the fields
    fn fine_approach(&mut self, frame: &SensorFrame, index: usize, goal: &Waypoint) -> TickOutput {
        let approach = self.config.mission.fine_approach;
        let distance = self.pose.distance_to(goal);
        let bearing_error = wrap_angle(self.pose.bearing_to(goal) - self.pose.theta);
        let (linear, omega) = approach.command(distance, bearing_error);
        let half_base = self.drive.half_base();
        let (left, right) = self
            .drive
            .saturate_wheel_speeds(linear - half_base * omega, linear + half_base * omega);

        debug!(tick = self.tick, d = distance, bearing_error, "fine approach");

        let mut output = self.idle(DriveMode::FineApproach, Some(frame));
        output.command = VelocityCommand::from_wheels(left, right, half_base);
        output.record.command = output.command;
        output.record.goal_index = Some(index);
        output.record.distance_to_goal = distance;
        output.record.arrival_tolerance = self.sequencer.tolerance(self.traveled);
        output
    }

    fn check_progress(&mut self, frame: &SensorFrame, distance: f64, goal: &Waypoint, dt: f64) {
        if !self.config.recovery.stall_detection || !self.progress.observe(distance, dt) {
            return;
        }
        self.stalls += 1;
        let goal_bearing = wrap_angle(self.pose.bearing_to(goal) - self.pose.theta);
        let (free_bearing, _) = frame.best_free_bearing(goal_bearing, &self.config.thresholds);
        let turn_left = free_bearing > 0.0;
        warn!(
            stalls = self.stalls,
            distance,
            turn_left,
            tick = self.tick,
            "no progress toward waypoint, escaping"
        );
        self.ramp.reset();
        self.maneuver = Some(Maneuver::stall_escape(&self.config.recovery, turn_left));
    }

    /// Zero-command output for ticks that do not navigate
    fn idle(&self, mode: DriveMode, frame: Option<&SensorFrame>) -> TickOutput {
        let state = self.sequencer.state();
        let feedback = match (mode, state) {
            (DriveMode::CollisionBackoff | DriveMode::StallEscape, _) => Feedback::Avoiding,
            (DriveMode::FineApproach, _) => Feedback::Seeking,
            (DriveMode::Settle, _) | (_, MissionState::Done) => Feedback::Arrived,
            _ => Feedback::Idle,
        };

        let mut record = TickRecord::idle(self.tick, self.pose, state, mode);
        record.collisions = self.collisions;
        record.feedback = feedback;
        record.trapped = self.trap.is_trapped();
        record.goal_index = self.sequencer.current_index();
        if let Some(frame) = frame {
            record.obstacle_count = frame.obstacle_count();
            record.sensor_faults = frame.fault_count();
        }

        TickOutput {
            command: VelocityCommand::zero(),
            feedback,
            state,
            record,
        }
    }
}
