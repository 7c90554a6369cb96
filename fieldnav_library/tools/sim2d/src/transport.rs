//! Robot transport backed by a simulated world

use crate::world::SimWorld;
use fieldnav_core::error::{NavError, NavResult};
use fieldnav_library::messages::{BumperState, Feedback, Pose2D, ProximityScan};
use fieldnav_library::nodes::RobotTransport;
use parking_lot::Mutex;
use std::sync::Arc;

/// Drives a shared [`SimWorld`]. Every wheel command advances the world by
/// one control period.
#[derive(Debug, Clone)]
pub struct SimTransport {
    world: Arc<Mutex<SimWorld>>,
    dt: f64,
    fail_after: Option<u64>,
    feedback: Arc<Mutex<Vec<Feedback>>>,
}

impl SimTransport {
    pub fn new(world: Arc<Mutex<SimWorld>>, dt: f64) -> Self {
        Self {
            world,
            dt,
            fail_after: None,
            feedback: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every read fail once the world has stepped `steps` times
    pub fn fail_after(mut self, steps: Option<u64>) -> Self {
        self.fail_after = steps;
        self
    }

    pub fn world(&self) -> Arc<Mutex<SimWorld>> {
        self.world.clone()
    }

    /// Feedback changes shown so far, oldest first
    pub fn feedback_log(&self) -> Arc<Mutex<Vec<Feedback>>> {
        self.feedback.clone()
    }

    fn check_link(&self, world: &SimWorld) -> NavResult<()> {
        match self.fail_after {
            Some(limit) if world.steps() >= limit => Err(NavError::hardware(format!(
                "simulated link lost after {} steps",
                limit
            ))),
            _ => Ok(()),
        }
    }
}

impl RobotTransport for SimTransport {
    fn read_position(&mut self) -> NavResult<Pose2D> {
        let world = self.world.lock();
        self.check_link(&world)?;
        Ok(world.odometry())
    }

    fn read_proximity(&mut self) -> NavResult<ProximityScan> {
        let mut world = self.world.lock();
        self.check_link(&world)?;
        Ok(world.proximity())
    }

    fn read_bumpers(&mut self) -> NavResult<BumperState> {
        let world = self.world.lock();
        self.check_link(&world)?;
        Ok(world.bumpers())
    }

    fn set_wheel_speeds(&mut self, left: f64, right: f64) -> NavResult<()> {
        if !(left.is_finite() && right.is_finite()) {
            return Err(NavError::hardware(format!(
                "refusing non-finite wheel speeds ({}, {})",
                left, right
            )));
        }
        self.world.lock().step(left, right, self.dt);
        Ok(())
    }

    /// Zero speeds without stepping; the world only advances on tick commands
    fn stop(&mut self) -> NavResult<()> {
        Ok(())
    }

    fn show_feedback(&mut self, feedback: Feedback) -> NavResult<()> {
        self.feedback.lock().push(feedback);
        Ok(())
    }
}
