//! Driver contract between the navigator and the robot base.

use crate::messages::{BumperState, Feedback, Pose2D, ProximityScan};
use fieldnav_core::error::NavResult;

/// Robot I/O as seen by the navigator
///
/// Every call may fail; the navigator treats any error as a hardware fault.
/// Calls are expected to complete within one control period.
pub trait RobotTransport: Send {
    /// Odometry pose in the drive's own frame
    fn read_position(&mut self) -> NavResult<Pose2D>;

    /// Raw intensities, index 0 leftmost
    fn read_proximity(&mut self) -> NavResult<ProximityScan>;

    fn read_bumpers(&mut self) -> NavResult<BumperState>;

    /// Wheel speeds in cm/s
    fn set_wheel_speeds(&mut self, left: f64, right: f64) -> NavResult<()>;

    /// Advisory indicator (LEDs, display); ignored by default
    fn show_feedback(&mut self, _feedback: Feedback) -> NavResult<()> {
        Ok(())
    }

    fn stop(&mut self) -> NavResult<()> {
        self.set_wheel_speeds(0.0, 0.0)
    }
}

impl<T: RobotTransport + ?Sized> RobotTransport for Box<T> {
    fn read_position(&mut self) -> NavResult<Pose2D> {
        (**self).read_position()
    }

    fn read_proximity(&mut self) -> NavResult<ProximityScan> {
        (**self).read_proximity()
    }

    fn read_bumpers(&mut self) -> NavResult<BumperState> {
        (**self).read_bumpers()
    }

    fn set_wheel_speeds(&mut self, left: f64, right: f64) -> NavResult<()> {
        (**self).set_wheel_speeds(left, right)
    }

    fn show_feedback(&mut self, feedback: Feedback) -> NavResult<()> {
        (**self).show_feedback(feedback)
    }
}
