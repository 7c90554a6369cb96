use serde::{Deserialize, Serialize};

/// Number of proximity sensors on the ring
pub const SENSOR_COUNT: usize = 7;

/// Raw proximity intensities, index 0 is the leftmost sensor
pub type ProximityScan = [f64; SENSOR_COUNT];

/// Front bumper switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BumperState {
    pub left: bool,
    pub right: bool,
}

impl BumperState {
    pub fn new(left: bool, right: bool) -> Self {
        Self { left, right }
    }

    pub fn released() -> Self {
        Self::default()
    }

    pub fn any(&self) -> bool {
        self.left || self.right
    }
}

/// Per-sensor fault, recovered locally and never fatal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SensorFault {
    /// Reading above the physical maximum; clamped
    OutOfRange { raw: f64 },
    /// Negative reading; ignored for this tick
    Negative { raw: f64 },
    /// NaN or infinite reading; ignored for this tick
    NonFinite,
}
