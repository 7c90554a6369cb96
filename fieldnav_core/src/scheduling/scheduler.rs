use crate::core::{Node, NodeInfo, NodeState};
use crate::error::{NavError, NavResult};
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Node registration with lifecycle tracking
struct RegisteredNode {
    node: Box<dyn Node>,
    priority: u32,
    initialized: bool,
    context: NodeInfo,
    last_tick: Option<Instant>,
}

/// Fixed-period orchestrator: holds nodes, drives the tick loop.
///
/// Nodes run sequentially in ascending priority order once per period.
/// `run` paces ticks against the wall clock; `run_ticks` steps a fixed
/// number of periods back to back, which keeps tests deterministic.
pub struct Scheduler {
    nodes: Vec<RegisteredNode>,
    running: Arc<AtomicBool>,
    period: Duration,
    scheduler_name: String,
    ticks: u64,
    started: bool,
    fault: Option<String>,
    install_signal_handler: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create an empty scheduler with a 50 ms period.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            period: Duration::from_millis(50),
            scheduler_name: "DefaultScheduler".to_string(),
            ticks: 0,
            started: false,
            fault: None,
            install_signal_handler: true,
        }
    }

    /// Set the scheduler name (chainable)
    pub fn with_name(mut self, name: &str) -> Self {
        self.scheduler_name = name.to_string();
        self
    }

    /// Set the tick period (chainable)
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Set the tick rate in Hz (chainable)
    pub fn with_rate(self, rate_hz: f64) -> Self {
        let rate_hz = if rate_hz.is_finite() && rate_hz > 0.0 {
            rate_hz
        } else {
            20.0
        };
        self.with_period(Duration::from_secs_f64(1.0 / rate_hz))
    }

    /// Skip the Ctrl+C handler, for schedulers that run on helper threads
    pub fn without_signal_handler(mut self) -> Self {
        self.install_signal_handler = false;
        self
    }

    /// Register a node. Lower priority numbers tick first.
    pub fn add(
        &mut self,
        node: Box<dyn Node>,
        priority: u32,
        logging_enabled: Option<bool>,
    ) -> &mut Self {
        let node_name = node.name().to_string();
        let logging_enabled = logging_enabled.unwrap_or(false);

        let mut context = NodeInfo::new(node_name.clone(), logging_enabled);
        context.set_tick_period(self.period);

        self.nodes.push(RegisteredNode {
            node,
            priority,
            initialized: false,
            context,
            last_tick: None,
        });
        self.nodes.sort_by_key(|registered| registered.priority);

        tracing::debug!(
            scheduler = %self.scheduler_name,
            node = %node_name,
            priority,
            logging_enabled,
            "added node"
        );

        self
    }

    pub fn name(&self) -> &str {
        &self.scheduler_name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of completed tick rounds
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Check if the scheduler is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the scheduler
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Shared running flag, for stopping the loop from another thread
    pub fn running_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Lifecycle state of a registered node
    pub fn node_state(&self, name: &str) -> Option<NodeState> {
        self.nodes
            .iter()
            .find(|registered| registered.node.name() == name)
            .map(|registered| registered.context.state().clone())
    }

    /// Main loop with automatic signal handling and cleanup
    pub fn run(&mut self) -> NavResult<()> {
        self.run_paced(None)
    }

    /// Run all nodes for a specified duration, then shutdown gracefully
    pub fn run_for(&mut self, duration: Duration) -> NavResult<()> {
        self.run_paced(Some(duration))
    }

    /// Step `count` tick rounds without sleeping, then shutdown
    pub fn run_ticks(&mut self, count: u64) -> NavResult<()> {
        self.initialize_nodes()?;
        for _ in 0..count {
            if !self.is_running() {
                break;
            }
            self.tick_once();
        }
        self.shutdown_nodes();
        self.finish()
    }

    /// Execute one tick round. Nodes are initialized on first use.
    pub fn tick_once(&mut self) {
        self.tick_round(false);
    }

    /// One round over all nodes; `paced` hands each node the measured
    /// interval since its previous tick instead of the nominal period
    fn tick_round(&mut self, paced: bool) {
        if !self.started {
            if let Err(e) = self.initialize_nodes() {
                tracing::error!(scheduler = %self.scheduler_name, "initialization failed: {}", e);
                self.stop();
                return;
            }
        }

        for idx in 0..self.nodes.len() {
            if !self.nodes[idx].initialized {
                continue;
            }
            let now = Instant::now();
            let registered = &mut self.nodes[idx];
            let interval = match (paced, registered.last_tick) {
                (true, Some(previous)) => now.duration_since(previous),
                _ => self.period,
            };
            registered.last_tick = Some(now);
            registered.context.set_tick_interval(interval);
            self.execute_single_node(idx);
            if self.nodes[idx].context.stop_requested() {
                tracing::info!(
                    scheduler = %self.scheduler_name,
                    node = %self.nodes[idx].node.name(),
                    "stop requested"
                );
                self.stop();
            }
        }
        self.ticks += 1;
    }

    fn run_paced(&mut self, duration: Option<Duration>) -> NavResult<()> {
        if self.install_signal_handler {
            let running = self.running.clone();
            if let Err(e) = ctrlc::set_handler(move || {
                eprintln!("{}", "\nCtrl+C received! Stopping navigation...".red());
                running.store(false, Ordering::Release);
            }) {
                tracing::warn!("Failed to set signal handler: {}", e);
            }
        }

        self.initialize_nodes()?;

        let start_time = Instant::now();
        while self.is_running() {
            if let Some(max_duration) = duration {
                if start_time.elapsed() >= max_duration {
                    tracing::info!(
                        scheduler = %self.scheduler_name,
                        "reached time limit of {:?}",
                        max_duration
                    );
                    break;
                }
            }

            let tick_start = Instant::now();
            self.tick_round(true);

            let elapsed = tick_start.elapsed();
            if elapsed < self.period {
                std::thread::sleep(self.period - elapsed);
            } else {
                tracing::warn!(
                    scheduler = %self.scheduler_name,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "tick overran period"
                );
            }
        }

        self.shutdown_nodes();
        self.finish()
    }

    fn initialize_nodes(&mut self) -> NavResult<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        for registered in self.nodes.iter_mut() {
            let node_name = registered.node.name();
            registered.context.set_state(NodeState::Initializing);
            match registered.node.init(&mut registered.context) {
                Ok(()) => {
                    registered.initialized = true;
                    registered.context.set_state(NodeState::Running);
                    tracing::debug!(node = %node_name, "initialized node");
                }
                Err(e) => {
                    registered
                        .context
                        .transition_to_error(format!("Initialization failed: {}", e));
                    self.running.store(false, Ordering::Release);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn execute_single_node(&mut self, idx: usize) {
        let registered = &mut self.nodes[idx];
        let node_name = registered.node.name();
        registered.context.start_tick();

        let tick_result = {
            let node = &mut registered.node;
            let context = &mut registered.context;
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                node.tick(Some(context));
            }))
        };

        match tick_result {
            Ok(()) => registered.context.record_tick(),
            Err(panic_err) => {
                let error_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    format!("Node panicked: {}", s)
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    format!("Node panicked: {}", s)
                } else {
                    "Node panicked with unknown error".to_string()
                };

                registered.context.record_tick_failure(error_msg.clone());
                registered.node.on_error(&error_msg, &mut registered.context);
                registered.context.transition_to_error(error_msg.clone());
                registered.initialized = false;
                self.fault = Some(format!("{}: {}", node_name, error_msg));
                self.running.store(false, Ordering::Release);
            }
        }
    }

    fn shutdown_nodes(&mut self) {
        for registered in self.nodes.iter_mut() {
            let node_name = registered.node.name();
            if !registered.initialized {
                continue;
            }
            registered.context.set_state(NodeState::Stopping);
            match registered.node.shutdown(&mut registered.context) {
                Ok(()) => {
                    registered.context.set_state(NodeState::Stopped);
                    tracing::debug!(node = %node_name, "shutdown node");
                }
                Err(e) => {
                    registered
                        .context
                        .transition_to_error(format!("Shutdown failed: {}", e));
                }
            }
            registered.initialized = false;
        }
        self.running.store(false, Ordering::Release);
        tracing::info!(
            scheduler = %self.scheduler_name,
            ticks = self.ticks,
            "scheduler shutdown complete"
        );
    }

    fn finish(&mut self) -> NavResult<()> {
        match self.fault.take() {
            Some(fault) => Err(NavError::Internal(fault)),
            None => Ok(()),
        }
    }
}
