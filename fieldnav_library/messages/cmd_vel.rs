use serde::{Deserialize, Serialize};

/// Velocity command for a differential-drive base
///
/// Linear speeds in cm/s, angular speed in rad/s. The wheel speeds are the
/// values actually sent to the motors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityCommand {
    pub v_linear: f64,
    pub omega: f64,
    pub v_left: f64,
    pub v_right: f64,
}

impl VelocityCommand {
    /// Create a zero velocity command (stop)
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build a command from wheel speeds and half the wheel separation
    pub fn from_wheels(v_left: f64, v_right: f64, half_base: f64) -> Self {
        let omega = if half_base > 0.0 {
            (v_right - v_left) / (2.0 * half_base)
        } else {
            0.0
        };
        Self {
            v_linear: (v_left + v_right) / 2.0,
            omega,
            v_left,
            v_right,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.v_left == 0.0 && self.v_right == 0.0
    }

    /// Speed of the slower wheel
    pub fn slower_wheel(&self) -> f64 {
        self.v_left.min(self.v_right)
    }

    /// Largest absolute wheel speed
    pub fn peak_wheel_speed(&self) -> f64 {
        self.v_left.abs().max(self.v_right.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero() {
        let cmd = VelocityCommand::zero();
        assert!(cmd.is_stopped());
        assert_relative_eq!(cmd.v_linear, 0.0);
    }

    #[test]
    fn test_from_wheels() {
        let cmd = VelocityCommand::from_wheels(8.0, 12.0, 10.0);
        assert_relative_eq!(cmd.v_linear, 10.0);
        assert_relative_eq!(cmd.omega, 0.2);
        assert_relative_eq!(cmd.slower_wheel(), 8.0);
        assert_relative_eq!(cmd.peak_wheel_speed(), 12.0);
    }
}
