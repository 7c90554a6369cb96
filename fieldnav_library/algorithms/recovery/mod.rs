//! Recovery Maneuvers
//!
//! Scripted multi-tick wheel sequences for bumper contacts and progress
//! stalls, plus the monitor that detects a stall.
//!
//! # Features
//!
//! - Collision back-off: reverse, then pause
//! - Stall escape: reverse, then a single-wheel turn toward free space
//! - Progress monitor over a sliding time window
//!
//! Maneuvers advance by `dt` per call and never sleep.

use crate::messages::DriveMode;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub backoff_speed: f64,
    pub backoff_duration: f64,
    pub pause_duration: f64,
    pub stall_detection: bool,
    /// Improvement toward the goal that counts as progress (cm)
    pub progress_eps: f64,
    /// Navigating time without progress before escaping (s)
    pub stall_window: f64,
    pub escape_reverse_speed: f64,
    pub escape_reverse_duration: f64,
    pub escape_turn_speed: f64,
    pub escape_turn_duration: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            backoff_speed: 10.0,
            backoff_duration: 1.0,
            pause_duration: 0.5,
            stall_detection: true,
            progress_eps: 2.0,
            stall_window: 5.0,
            escape_reverse_speed: 8.0,
            escape_reverse_duration: 0.6,
            escape_turn_speed: 10.0,
            escape_turn_duration: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManeuverKind {
    CollisionBackoff,
    StallEscape,
}

impl ManeuverKind {
    pub fn mode(&self) -> DriveMode {
        match self {
            ManeuverKind::CollisionBackoff => DriveMode::CollisionBackoff,
            ManeuverKind::StallEscape => DriveMode::StallEscape,
        }
    }
}

/// Constant wheel speeds held for a duration
#[derive(Debug, Clone, Copy, PartialEq)]
struct Step {
    left: f64,
    right: f64,
    remaining: f64,
}

/// Scripted wheel sequence in progress
#[derive(Debug, Clone, PartialEq)]
pub struct Maneuver {
    kind: ManeuverKind,
    steps: VecDeque<Step>,
}

impl Maneuver {
    pub fn collision_backoff(config: &RecoveryConfig) -> Self {
        let reverse = -config.backoff_speed.abs();
        Self::from_steps(
            ManeuverKind::CollisionBackoff,
            [
                (reverse, reverse, config.backoff_duration),
                (0.0, 0.0, config.pause_duration),
            ],
        )
    }

    /// Reverse, then pivot on one wheel toward `turn_left` side
    pub fn stall_escape(config: &RecoveryConfig, turn_left: bool) -> Self {
        let reverse = -config.escape_reverse_speed.abs();
        let turn = config.escape_turn_speed.abs();
        let (left, right) = if turn_left { (0.0, turn) } else { (turn, 0.0) };
        Self::from_steps(
            ManeuverKind::StallEscape,
            [
                (reverse, reverse, config.escape_reverse_duration),
                (left, right, config.escape_turn_duration),
            ],
        )
    }

    fn from_steps(kind: ManeuverKind, steps: [(f64, f64, f64); 2]) -> Self {
        Self {
            kind,
            steps: steps
                .into_iter()
                .filter(|&(_, _, duration)| duration > 0.0)
                .map(|(left, right, remaining)| Step {
                    left,
                    right,
                    remaining,
                })
                .collect(),
        }
    }

    pub fn kind(&self) -> ManeuverKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }

    /// Wheel speeds for the next `dt` seconds, `None` once the script is over
    pub fn advance(&mut self, dt: f64) -> Option<(f64, f64)> {
        let step = self.steps.front_mut()?;
        let speeds = (step.left, step.right);
        step.remaining -= dt;
        // Half-tick slack keeps float accumulation from adding a tick
        if step.remaining <= dt * 0.5 {
            self.steps.pop_front();
        }
        Some(speeds)
    }
}

/// Detects a lack of progress toward the active waypoint
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressMonitor {
    eps: f64,
    window: f64,
    best_distance: f64,
    stalled_for: f64,
}

impl ProgressMonitor {
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            eps: config.progress_eps,
            window: config.stall_window,
            best_distance: f64::INFINITY,
            stalled_for: 0.0,
        }
    }

    /// Forget history, e.g. after a waypoint change or a maneuver
    pub fn reset(&mut self) {
        self.best_distance = f64::INFINITY;
        self.stalled_for = 0.0;
    }

    /// Record a navigating tick; true when the window elapsed without progress
    pub fn observe(&mut self, distance: f64, dt: f64) -> bool {
        if distance <= self.best_distance - self.eps || !self.best_distance.is_finite() {
            self.best_distance = distance;
            self.stalled_for = 0.0;
            return false;
        }
        self.stalled_for += dt;
        if self.stalled_for + dt * 0.5 >= self.window {
            self.reset();
            return true;
        }
        false
    }

    pub fn stalled_for(&self) -> f64 {
        self.stalled_for
    }
}
