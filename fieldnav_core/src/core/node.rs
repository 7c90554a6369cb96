use std::fmt;
use std::time::{Duration, Instant};

/// Trait for providing compact logging summaries of message types
///
/// Large per-tick records implement this so nodes can log one line without
/// dumping every field.
pub trait LogSummary {
    /// Return a compact string representation suitable for logging
    fn log_summary(&self) -> String;
}

/// Node states for monitoring and lifecycle management
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    Uninitialized,
    Initializing,
    Running,
    Stopping,
    Stopped,
    Error(String),
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Uninitialized => write!(f, "Uninitialized"),
            NodeState::Initializing => write!(f, "Initializing"),
            NodeState::Running => write!(f, "Running"),
            NodeState::Stopping => write!(f, "Stopping"),
            NodeState::Stopped => write!(f, "Stopped"),
            NodeState::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

/// Performance metrics for node execution
#[derive(Debug, Clone, Default)]
pub struct NodeMetrics {
    pub total_ticks: u64,
    pub successful_ticks: u64,
    pub failed_ticks: u64,
    pub avg_tick_duration_ms: f64,
    pub max_tick_duration_ms: f64,
    pub last_tick_duration_ms: f64,
    pub errors_count: u64,
    pub warnings_count: u64,
}

const HISTORY_LIMIT: usize = 100;

/// Per-node context handed to every lifecycle call
pub struct NodeInfo {
    name: String,

    state: NodeState,
    previous_state: NodeState,

    logging_enabled: bool,
    metrics: NodeMetrics,

    tick_start_time: Option<Instant>,
    tick_period: Duration,
    tick_interval: Duration,

    error_history: Vec<String>,
    warning_history: Vec<String>,

    stop_requested: bool,
}

impl NodeInfo {
    pub fn new(node_name: String, logging_enabled: bool) -> Self {
        Self {
            name: node_name,
            state: NodeState::Uninitialized,
            previous_state: NodeState::Uninitialized,
            logging_enabled,
            metrics: NodeMetrics::default(),
            tick_start_time: None,
            tick_period: Duration::from_millis(50),
            tick_interval: Duration::from_millis(50),
            error_history: Vec::new(),
            warning_history: Vec::new(),
            stop_requested: false,
        }
    }

    // State Management Methods
    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn previous_state(&self) -> &NodeState {
        &self.previous_state
    }

    pub fn set_state(&mut self, new_state: NodeState) {
        if self.state != new_state {
            self.previous_state = self.state.clone();
            self.state = new_state;
        }
    }

    pub fn transition_to_error(&mut self, error_msg: String) {
        self.log_error(&error_msg);
        self.set_state(NodeState::Error(error_msg));
    }

    /// Ask the owning scheduler to stop after the current tick
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    // Tick Management
    pub fn start_tick(&mut self) {
        self.tick_start_time = Some(Instant::now());
        if self.state == NodeState::Uninitialized {
            self.set_state(NodeState::Running);
        }
    }

    pub fn record_tick(&mut self) {
        if let Some(start_time) = self.tick_start_time.take() {
            let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

            self.metrics.total_ticks += 1;
            self.metrics.successful_ticks += 1;
            self.metrics.last_tick_duration_ms = duration_ms;
            if duration_ms > self.metrics.max_tick_duration_ms {
                self.metrics.max_tick_duration_ms = duration_ms;
            }

            let total = self.metrics.avg_tick_duration_ms
                * (self.metrics.successful_ticks - 1) as f64;
            self.metrics.avg_tick_duration_ms =
                (total + duration_ms) / self.metrics.successful_ticks as f64;
        }
    }

    pub fn record_tick_failure(&mut self, error_msg: String) {
        self.metrics.total_ticks += 1;
        self.metrics.failed_ticks += 1;
        if let Some(start_time) = self.tick_start_time.take() {
            self.metrics.last_tick_duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        }
        self.log_error(&error_msg);
    }

    // Logging Methods
    pub fn log_info(&self, message: &str) {
        if self.logging_enabled {
            tracing::info!(node = %self.name, "{}", message);
        }
    }

    pub fn log_warning(&mut self, message: &str) {
        tracing::warn!(node = %self.name, "{}", message);
        push_bounded(&mut self.warning_history, message);
        self.metrics.warnings_count += 1;
    }

    pub fn log_error(&mut self, message: &str) {
        tracing::error!(node = %self.name, "{}", message);
        push_bounded(&mut self.error_history, message);
        self.metrics.errors_count += 1;
    }

    /// Log a structured record at debug level through its summary
    pub fn log_record<T: LogSummary>(&self, topic: &str, data: &T) {
        if self.logging_enabled {
            tracing::debug!(node = %self.name, topic, "{}", data.log_summary());
        }
    }

    // Getters
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }
    pub fn errors(&self) -> &[String] {
        &self.error_history
    }
    pub fn warnings(&self) -> &[String] {
        &self.warning_history
    }
    /// Nominal period between ticks, set by the scheduler
    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }
    /// Time since this node's previous tick started
    ///
    /// Measured when paced against the wall clock, the nominal period when
    /// stepped.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    // Setters
    pub fn set_tick_period(&mut self, period: Duration) {
        self.tick_period = period;
        self.tick_interval = period;
    }
    pub fn set_tick_interval(&mut self, interval: Duration) {
        self.tick_interval = interval;
    }
}

fn push_bounded(history: &mut Vec<String>, message: &str) {
    history.push(message.to_string());
    if history.len() > HISTORY_LIMIT {
        history.remove(0);
    }
}

/// Trait for fieldnav nodes with full lifecycle support
pub trait Node: Send {
    /// Get the node's name (must be unique)
    fn name(&self) -> &'static str;

    /// Initialize the node (called once at startup)
    fn init(&mut self, ctx: &mut NodeInfo) -> crate::error::NavResult<()> {
        ctx.log_info("Node initialized successfully");
        Ok(())
    }

    /// Main execution step (called once per period)
    fn tick(&mut self, ctx: Option<&mut NodeInfo>);

    /// Shutdown the node (called once at cleanup)
    fn shutdown(&mut self, ctx: &mut NodeInfo) -> crate::error::NavResult<()> {
        ctx.log_info("Node shutdown successfully");
        Ok(())
    }

    /// Handle errors (optional override)
    fn on_error(&mut self, error: &str, ctx: &mut NodeInfo) {
        ctx.log_error(&format!("Node error: {}", error));
    }
}

// LogSummary implementations for primitive types
impl LogSummary for f64 {
    fn log_summary(&self) -> String {
        format!("{:.3}", self)
    }
}

impl LogSummary for bool {
    fn log_summary(&self) -> String {
        self.to_string()
    }
}

impl LogSummary for String {
    fn log_summary(&self) -> String {
        self.clone()
    }
}
