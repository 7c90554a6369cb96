// Message types shared by the navigation algorithms and nodes

pub mod cmd_vel;
pub mod diagnostics;
pub mod geometry;
pub mod navigation;
pub mod sensor;
pub mod telemetry;

// Re-export all message types
pub use cmd_vel::VelocityCommand;
pub use diagnostics::{DriveMode, Feedback, SafetyLevel};
pub use geometry::{wrap_angle, Force2D, Pose2D, Waypoint};
pub use navigation::{AbortReason, MissionPlan, MissionReport, MissionState};
pub use sensor::{BumperState, ProximityScan, SensorFault, SENSOR_COUNT};
pub use telemetry::TickRecord;
