//! # fieldnav Core
//!
//! The runtime system underneath the fieldnav navigation stack.
//!
//! This crate provides the fundamental building blocks the navigator is
//! assembled from:
//!
//! - **Nodes**: units of periodic work with an init / tick / shutdown lifecycle
//! - **Scheduling**: fixed-period execution, real-time or stepped
//! - **Communication**: halt and cancel signals plus bounded SPSC links
//! - **Params**: YAML / TOML / JSON parameter files
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldnav_core::{Node, NodeInfo, Scheduler};
//!
//! struct Counter {
//!     ticks: u64,
//! }
//!
//! impl Node for Counter {
//!     fn name(&self) -> &'static str { "counter" }
//!
//!     fn tick(&mut self, _ctx: Option<&mut NodeInfo>) {
//!         self.ticks += 1;
//!     }
//! }
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.add(Box::new(Counter { ticks: 0 }), 0, None);
//! scheduler.run_ticks(10).unwrap();
//! ```

pub mod communication;
pub mod core;
pub mod error;
pub mod params;
pub mod scheduling;

// Re-export commonly used types for easy access
pub use crate::core::{LogSummary, Node, NodeInfo, NodeMetrics, NodeState};
pub use communication::{CancelToken, HaltSignal, Link, LinkRole};
pub use error::{NavError, NavResult};
pub use scheduling::Scheduler;

// Re-export communication traits for backend-agnostic usage
pub use communication::traits::{Publisher, Subscriber};
