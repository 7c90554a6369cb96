//! # fieldnav Library
//!
//! Messages, potential-field algorithms and nodes for reactive waypoint
//! navigation on a differential-drive robot with a seven-sensor proximity
//! ring.
//!
//! ## Structure
//!
//! ```text
//! fieldnav_library/
//! ── messages/       # Poses, commands, mission types, telemetry records
//! ── algorithms/     # Sensor model, force fields, governor, drive mapping
//! ── nodes/          # Control loop, navigator and safety monitor
//! ── config.rs       # NavConfig, loaded from YAML / TOML / JSON
//! ── tools/          # sim2d kinematic simulator (separate crate)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use fieldnav_library::{ControlLoop, MissionPlan, NavConfig, Pose2D, Waypoint};
//!
//! let plan = MissionPlan::new(Pose2D::origin(), vec![Waypoint::new(100.0, 0.0)]);
//! let control = ControlLoop::new(NavConfig::default(), plan).unwrap();
//! assert!(!control.is_finished());
//! ```

pub mod algorithms;
pub mod config;
pub mod messages;
pub mod nodes;

// Re-export core traits needed for message types
pub use fieldnav_core::core::LogSummary;

// Re-export message types at the crate root for convenience
pub use messages::*;

pub use config::NavConfig;
pub use nodes::{
    ChannelTelemetry, ControlLoop, HaltPolicy, NavigatorNode, NullTelemetry, RecordingTelemetry,
    RobotTransport, SafetyMonitorNode, TelemetrySink, TickInputs, TickOutput,
};
