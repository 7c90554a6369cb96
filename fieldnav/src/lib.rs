//! # fieldnav
//!
//! Reactive waypoint navigation for differential-drive robots: attractive
//! and repulsive potential fields over a seven-sensor proximity ring, with
//! predictive braking, a minimum-arc turning constraint and local-minimum
//! escape.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fieldnav::prelude::*;
//!
//! fn run(transport: impl RobotTransport + 'static) -> AnyResult<()> {
//!     let config = NavConfig::load(std::path::Path::new("nav.yaml"))?;
//!     let plan = MissionPlan::load(std::path::Path::new("mission.yaml"))?;
//!     let period = config.control.period();
//!
//!     let navigator = NavigatorNode::new(config, plan, transport)?;
//!     let report = navigator.report_handle();
//!
//!     let mut scheduler = Scheduler::new().with_period(period);
//!     scheduler.add(Box::new(navigator), 0, Some(true));
//!     scheduler.run()?;
//!
//!     println!("{}", report.lock().state);
//!     Ok(())
//! }
//! ```

// Re-export core components
pub use fieldnav_core::{self, *};

// Re-export the library with alias
pub use fieldnav_library as library;

/// The fieldnav prelude - everything needed to assemble a navigator
pub mod prelude {
    // Core node types
    pub use fieldnav_core::core::{LogSummary, Node, NodeInfo, NodeState};

    // Communication types
    pub use fieldnav_core::communication::{CancelToken, HaltSignal, Link};

    // Scheduling
    pub use fieldnav_core::scheduling::Scheduler;

    // Error types
    pub use fieldnav_core::error::{NavError, NavResult};

    // Common std types
    pub use std::sync::Arc;
    pub use std::time::{Duration, Instant};

    // Common traits
    pub use serde::{Deserialize, Serialize};

    // Re-export anyhow for error handling
    pub use anyhow::{anyhow, bail, ensure, Context, Result as AnyResult};

    // Configuration, nodes and messages
    pub use fieldnav_library::config::NavConfig;
    pub use fieldnav_library::messages::*;
    pub use fieldnav_library::nodes::{
        ChannelTelemetry, ControlLoop, HaltPolicy, NavigatorNode, NullTelemetry,
        RecordingTelemetry, RobotTransport, SafetyMonitorNode, TelemetrySink, TickInputs,
        TickOutput,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get fieldnav version
pub fn version() -> &'static str {
    VERSION
}
