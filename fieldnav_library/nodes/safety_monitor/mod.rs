//! Safety Monitor Node
//!
//! Independently clocked writer of the navigator's [`HaltSignal`]. Each tick
//! polls a set of hazard probes; any active hazard raises the halt. How the
//! halt is released depends on the [`HaltPolicy`].
//!
//! # Example
//!
//! ```rust
//! use fieldnav_core::{HaltSignal, Node};
//! use fieldnav_library::nodes::safety_monitor::{HaltPolicy, SafetyMonitorNode};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! let halt = HaltSignal::new();
//! let tilt = Arc::new(AtomicBool::new(false));
//! let probe = tilt.clone();
//!
//! let mut monitor = SafetyMonitorNode::new(halt.clone())
//!     .with_policy(HaltPolicy::AutoClear { clear_after_ticks: 2 });
//! monitor.add_probe("tilt", move || {
//!     probe.load(Ordering::Acquire).then(|| "robot tilted".to_string())
//! });
//!
//! tilt.store(true, Ordering::Release);
//! monitor.tick(None);
//! assert!(halt.is_raised());
//!
//! tilt.store(false, Ordering::Release);
//! monitor.tick(None);
//! monitor.tick(None);
//! assert!(!halt.is_raised());
//! ```

use fieldnav_core::{HaltSignal, Node, NodeInfo};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Source of hazard conditions, polled once per monitor tick
pub trait HazardProbe: Send {
    /// Description of the hazard if one is present
    fn check(&mut self) -> Option<String>;
}

impl<F> HazardProbe for F
where
    F: FnMut() -> Option<String> + Send,
{
    fn check(&mut self) -> Option<String> {
        self()
    }
}

/// How a raised halt is released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum HaltPolicy {
    /// Stays raised until the reset button is pressed with no hazard active
    #[default]
    Latching,
    /// Releases after this many consecutive hazard-free ticks
    AutoClear { clear_after_ticks: u32 },
}

/// Operator reset, pressable from any thread
#[derive(Debug, Clone, Default)]
pub struct ResetButton(Arc<AtomicBool>);

impl ResetButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume a pending press
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

struct NamedProbe {
    name: String,
    probe: Box<dyn HazardProbe>,
}

/// Safety Monitor Node - Raises the navigator halt on hazard conditions
pub struct SafetyMonitorNode {
    halt: HaltSignal,
    probes: Vec<NamedProbe>,
    policy: HaltPolicy,
    reset: ResetButton,
    reason: Option<String>,
    clean_ticks: u32,
    trips: u64,
}

impl SafetyMonitorNode {
    /// Create a latching monitor writing `halt`
    pub fn new(halt: HaltSignal) -> Self {
        Self {
            halt,
            probes: Vec::new(),
            policy: HaltPolicy::default(),
            reset: ResetButton::new(),
            reason: None,
            clean_ticks: 0,
            trips: 0,
        }
    }

    pub fn with_policy(mut self, policy: HaltPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register a named hazard probe
    pub fn add_probe(&mut self, name: &str, probe: impl HazardProbe + 'static) {
        self.probes.push(NamedProbe {
            name: name.to_string(),
            probe: Box::new(probe),
        });
    }

    /// Handle for releasing a latched halt
    pub fn reset_button(&self) -> ResetButton {
        self.reset.clone()
    }

    /// Raise the halt by hand
    pub fn trigger(&mut self, reason: &str) {
        self.engage(reason.to_string());
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_raised()
    }

    /// Reason for the current halt
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Times the halt went from released to raised
    pub fn trips(&self) -> u64 {
        self.trips
    }

    fn engage(&mut self, reason: String) {
        self.clean_ticks = 0;
        if self.halt.is_raised() {
            return;
        }
        self.trips += 1;
        warn!(%reason, trips = self.trips, "halt raised");
        self.reason = Some(reason);
        self.halt.raise();
    }

    fn release(&mut self) {
        if let Some(reason) = self.reason.take() {
            info!(%reason, "halt released");
        }
        self.clean_ticks = 0;
        self.halt.clear();
    }

    fn poll_probes(&mut self) -> Option<String> {
        let mut hazards = Vec::new();
        for named in self.probes.iter_mut() {
            if let Some(detail) = named.probe.check() {
                hazards.push(format!("{}: {}", named.name, detail));
            }
        }
        (!hazards.is_empty()).then(|| hazards.join("; "))
    }
}

impl Node for SafetyMonitorNode {
    fn name(&self) -> &'static str {
        "SafetyMonitorNode"
    }

    fn tick(&mut self, ctx: Option<&mut NodeInfo>) {
        let reset_pressed = self.reset.take();

        if let Some(hazard) = self.poll_probes() {
            if let Some(ctx) = ctx {
                if !self.halt.is_raised() {
                    ctx.log_warning(&format!("hazard detected: {}", hazard));
                }
            }
            self.engage(hazard);
            return;
        }

        if !self.halt.is_raised() {
            return;
        }
        match self.policy {
            HaltPolicy::Latching => {
                if reset_pressed {
                    self.release();
                }
            }
            HaltPolicy::AutoClear { clear_after_ticks } => {
                self.clean_ticks += 1;
                if reset_pressed || self.clean_ticks >= clear_after_ticks {
                    self.release();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn switch() -> (Arc<Mutex<bool>>, impl HazardProbe + 'static) {
        let state = Arc::new(Mutex::new(false));
        let probe_state = state.clone();
        let probe = move || (*probe_state.lock()).then(|| "bump".to_string());
        (state, probe)
    }

    #[test]
    fn test_latching_needs_reset() {
        let halt = HaltSignal::new();
        let mut monitor = SafetyMonitorNode::new(halt.clone());
        let (hazard, probe) = switch();
        monitor.add_probe("cliff", probe);

        *hazard.lock() = true;
        monitor.tick(None);
        assert!(halt.is_raised());
        assert_eq!(monitor.reason(), Some("cliff: bump"));

        *hazard.lock() = false;
        for _ in 0..10 {
            monitor.tick(None);
        }
        assert!(halt.is_raised());

        monitor.reset_button().press();
        monitor.tick(None);
        assert!(!halt.is_raised());
        assert_eq!(monitor.reason(), None);
    }

    #[test]
    fn test_reset_ignored_while_hazard_active() {
        let halt = HaltSignal::new();
        let mut monitor = SafetyMonitorNode::new(halt.clone());
        let (hazard, probe) = switch();
        monitor.add_probe("cliff", probe);

        *hazard.lock() = true;
        monitor.tick(None);
        monitor.reset_button().press();
        monitor.tick(None);
        assert!(halt.is_raised());

        // The press was consumed while the hazard was active
        *hazard.lock() = false;
        monitor.tick(None);
        assert!(halt.is_raised());
    }

    #[test]
    fn test_auto_clear_after_clean_ticks() {
        let halt = HaltSignal::new();
        let mut monitor = SafetyMonitorNode::new(halt.clone())
            .with_policy(HaltPolicy::AutoClear { clear_after_ticks: 3 });
        let (hazard, probe) = switch();
        monitor.add_probe("cliff", probe);

        *hazard.lock() = true;
        monitor.tick(None);
        *hazard.lock() = false;
        monitor.tick(None);
        monitor.tick(None);
        assert!(halt.is_raised());
        monitor.tick(None);
        assert!(!halt.is_raised());
        assert_eq!(monitor.trips(), 1);
    }

    #[test]
    fn test_manual_trigger_counts_trips_once() {
        let halt = HaltSignal::new();
        let mut monitor = SafetyMonitorNode::new(halt.clone());
        monitor.trigger("operator");
        monitor.trigger("operator again");
        assert!(monitor.is_halted());
        assert_eq!(monitor.trips(), 1);
        assert_eq!(monitor.reason(), Some("operator"));
    }

    #[test]
    fn test_policy_from_yaml() {
        let policy: HaltPolicy =
            serde_yaml::from_str("policy: auto_clear\nclear_after_ticks: 5\n").unwrap();
        assert_eq!(policy, HaltPolicy::AutoClear { clear_after_ticks: 5 });
    }
}
