//! # sim2d - Kinematic 2D simulator for fieldnav
//!
//! A headless stand-in for the robot: differential-drive kinematics with
//! wheel slip, ray-cast proximity sensors using the navigator's own
//! calibration tables, and contact bumpers. Runs are seeded and reproducible.
//!
//! ## Binary Usage
//! ```bash
//! sim2d --mission mission.yaml --world world.yaml --config nav.yaml
//! ```
//!
//! ## Library Usage
//! ```rust,no_run
//! use fieldnav_library::config::NavConfig;
//! use fieldnav_library::messages::{MissionPlan, Pose2D, Waypoint};
//! use sim2d::{MissionRunner, Obstacle, SimConfig};
//!
//! let plan = MissionPlan::new(Pose2D::origin(), vec![Waypoint::new(150.0, 0.0)]);
//! let world = SimConfig::default().with_obstacle(Obstacle::circle(70.0, 5.0, 8.0));
//!
//! let run = MissionRunner::new(NavConfig::default(), plan, world)
//!     .max_ticks(1200)
//!     .run()
//!     .unwrap();
//! println!("{} after {} ticks", run.report.state, run.report.ticks);
//! ```

pub mod runner;
pub mod sensors;
pub mod transport;
pub mod world;

pub use runner::{MissionRun, MissionRunner};
pub use sensors::NoiseModel;
pub use transport::SimTransport;
pub use world::{Obstacle, SimConfig, SimWorld};
