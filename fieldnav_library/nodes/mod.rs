//! fieldnav Nodes
//!
//! The control loop and the nodes that bind it to a robot.
//!
//! # Nodes
//!
//! - `NavigatorNode` - runs the control loop against a `RobotTransport`
//! - `SafetyMonitorNode` - independently clocked writer of the halt signal
//!
//! # Seams
//!
//! - `RobotTransport` - odometry, proximity, bumpers and wheel speeds
//! - `TelemetrySink` - per-tick records, never blocking the tick
//!
//! # Usage
//!
//! ```rust,ignore
//! use fieldnav_library::nodes::*;
//!
//! let monitor = SafetyMonitorNode::new(halt.clone());
//! let navigator = NavigatorNode::new(config, plan, transport)?
//!     .with_halt_signal(halt)
//!     .with_cancel_token(cancel);
//!
//! let mut scheduler = Scheduler::new().with_period(config.control.period());
//! scheduler.add(Box::new(navigator), 0, Some(true));
//! scheduler.run()?;
//! ```

pub mod control_loop;
pub mod navigator_node;
pub mod safety_monitor;
pub mod telemetry;
pub mod transport;

pub use control_loop::{ControlLoop, PoseTransform, TickInputs, TickOutput};
pub use navigator_node::NavigatorNode;
pub use safety_monitor::{HaltPolicy, HazardProbe, ResetButton, SafetyMonitorNode};
pub use telemetry::{ChannelTelemetry, NullTelemetry, RecordingTelemetry, TelemetrySink};
pub use transport::RobotTransport;
