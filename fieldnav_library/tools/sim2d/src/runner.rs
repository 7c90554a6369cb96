//! Headless mission runner
//!
//! Wires a [`NavigatorNode`] and a [`SafetyMonitorNode`] to a simulated
//! world and runs them either stepped (deterministic, as fast as possible)
//! or paced against the wall clock with the monitor on its own thread.

use crate::transport::SimTransport;
use crate::world::{SimConfig, SimWorld};
use fieldnav_core::error::{NavError, NavResult};
use fieldnav_core::{HaltSignal, Scheduler};
use fieldnav_library::config::NavConfig;
use fieldnav_library::messages::{MissionPlan, MissionReport, Pose2D, TickRecord};
use fieldnav_library::nodes::{HaltPolicy, NavigatorNode, RecordingTelemetry, SafetyMonitorNode};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Ticks a clearance hazard must stay absent before the halt auto-clears
const HALT_CLEAR_TICKS: u32 = 10;

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct MissionRun {
    pub report: MissionReport,
    pub records: Vec<TickRecord>,
    /// True world poses, one per simulation step plus the start
    pub trajectory: Vec<Pose2D>,
    pub contacts: u64,
    /// Smallest body-to-obstacle gap over the run (cm)
    pub closest_approach: f64,
}

impl MissionRun {
    /// Final true distance to the last waypoint
    pub fn final_distance(&self, plan: &MissionPlan) -> f64 {
        match (self.trajectory.last(), plan.final_goal()) {
            (Some(pose), Some(goal)) => pose.distance_to(goal),
            _ => f64::INFINITY,
        }
    }
}

pub struct MissionRunner {
    nav: NavConfig,
    plan: MissionPlan,
    sim: SimConfig,
    max_ticks: u64,
    halt_below_clearance: Option<f64>,
    realtime: bool,
    fail_after: Option<u64>,
}

impl MissionRunner {
    /// The plan's initial pose is where the simulated robot starts
    pub fn new(nav: NavConfig, plan: MissionPlan, mut sim: SimConfig) -> Self {
        sim.start = plan.initial_pose;
        Self {
            nav,
            plan,
            sim,
            max_ticks: 2400,
            halt_below_clearance: None,
            realtime: false,
            fail_after: None,
        }
    }

    pub fn max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = ticks;
        self
    }

    /// Raise the halt while the robot body is closer than this to an obstacle
    pub fn halt_below_clearance(mut self, clearance: Option<f64>) -> Self {
        self.halt_below_clearance = clearance;
        self
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Cut the simulated link after this many world steps
    pub fn fail_transport_after(mut self, steps: Option<u64>) -> Self {
        self.fail_after = steps;
        self
    }

    fn monitor(&self, world: &Arc<Mutex<SimWorld>>, halt: HaltSignal) -> SafetyMonitorNode {
        let mut monitor = SafetyMonitorNode::new(halt).with_policy(HaltPolicy::AutoClear {
            clear_after_ticks: HALT_CLEAR_TICKS,
        });
        if let Some(limit) = self.halt_below_clearance {
            let world = world.clone();
            monitor.add_probe("clearance", move || {
                let clearance = world.lock().clearance();
                (clearance < limit).then(|| format!("{:.1} cm from an obstacle", clearance))
            });
        }
        monitor
    }

    pub fn run(self) -> NavResult<MissionRun> {
        self.nav.validate()?;
        let world = Arc::new(Mutex::new(SimWorld::new(
            self.sim.clone(),
            &self.nav.robot,
            self.nav.sensors.clone(),
        )));
        let transport =
            SimTransport::new(world.clone(), self.nav.control.dt).fail_after(self.fail_after);
        let telemetry = RecordingTelemetry::new();
        let records = telemetry.handle();
        let halt = HaltSignal::new();

        let navigator = NavigatorNode::with_telemetry(
            self.nav.clone(),
            self.plan.clone(),
            transport,
            telemetry,
        )?
        .with_halt_signal(halt.clone());
        let report = navigator.report_handle();
        let monitor = self.monitor(&world, halt);
        let period = self.nav.control.period();

        info!(
            waypoints = self.plan.waypoints.len(),
            obstacles = self.sim.obstacles.len(),
            max_ticks = self.max_ticks,
            realtime = self.realtime,
            "starting simulated mission"
        );

        if self.realtime {
            let mut safety = Scheduler::new()
                .with_name("sim2d-safety")
                .with_period(period / 2)
                .without_signal_handler();
            safety.add(Box::new(monitor), 0, None);
            let safety_running = safety.running_handle();
            let safety_thread = std::thread::spawn(move || safety.run());

            let mut scheduler = Scheduler::new().with_name("sim2d").with_period(period);
            scheduler.add(Box::new(navigator), 0, None);
            let result = scheduler.run_for(period * self.max_ticks.min(u32::MAX as u64) as u32);

            safety_running.store(false, Ordering::Release);
            let safety_result = safety_thread
                .join()
                .map_err(|_| NavError::Internal("safety scheduler thread panicked".to_string()))?;
            result?;
            safety_result?;
        } else {
            let mut scheduler = Scheduler::new()
                .with_name("sim2d")
                .with_period(period)
                .without_signal_handler();
            scheduler.add(Box::new(monitor), 0, None);
            scheduler.add(Box::new(navigator), 1, None);
            scheduler.run_ticks(self.max_ticks)?;
            debug!(ticks = scheduler.tick_count(), "stepped run finished");
        }

        let report = report.lock().clone();
        let records = records.lock().clone();
        let world = world.lock();
        info!(
            state = %report.state,
            ticks = report.ticks,
            contacts = world.contacts(),
            closest_approach = world.closest_approach(),
            "simulated mission finished"
        );
        Ok(MissionRun {
            report,
            records,
            trajectory: world.trajectory().to_vec(),
            contacts: world.contacts(),
            closest_approach: world.closest_approach(),
        })
    }
}
