//! Potential-field navigation algorithms
//!
//! Pure computation, no I/O. Each stage takes the calibrated sensor frame
//! and configuration and returns plain values, so every stage can be
//! tested in isolation and reused outside the control loop.
//!
//! # Pipeline
//!
//! - **sensor_frame**: raw intensities → distances and bearings
//! - **attractive_field**: goal pull, four selectable laws
//! - **gap**: openings between blocked sensors
//! - **repulsive_field**: per-obstacle push, gap-aware
//! - **force_combiner**: unit-direction blend into one heading
//! - **trap_detector**: local-minimum detection and gain changes
//! - **velocity_governor**: predictive braking, ramp, derating, floors
//! - **differential_drive**: wheel mapping with the minimum-arc constraint
//! - **waypoint_sequencer**: mission state machine
//! - **recovery**: back-off and stall-escape scripts

pub mod attractive_field;
pub mod differential_drive;
pub mod force_combiner;
pub mod gap;
pub mod recovery;
pub mod repulsive_field;
pub mod sensor_frame;
pub mod trap_detector;
pub mod velocity_governor;
pub mod waypoint_sequencer;
