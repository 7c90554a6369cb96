use crate::config::NavConfig;
use crate::messages::{AbortReason, Feedback, MissionPlan, MissionReport, MissionState};
use crate::nodes::control_loop::{ControlLoop, TickInputs, TickOutput};
use crate::nodes::telemetry::{NullTelemetry, TelemetrySink};
use crate::nodes::transport::RobotTransport;
use fieldnav_core::error::{NavError, NavResult};
use fieldnav_core::{CancelToken, HaltSignal, Node, NodeInfo};
use parking_lot::Mutex;
use std::sync::Arc;

/// Navigator Node - Runs the potential-field control loop against a robot
///
/// Each tick reads odometry, proximity and bumpers from the transport, steps
/// the control loop and writes the wheel command back. The halt signal is
/// read once per tick; cancellation is checked before any I/O and always
/// leaves the wheels stopped. The node asks its scheduler to stop once the
/// mission is done or aborted.
pub struct NavigatorNode<T: RobotTransport, S: TelemetrySink = NullTelemetry> {
    control: ControlLoop,
    transport: T,
    telemetry: S,
    halt: HaltSignal,
    cancel: CancelToken,
    report: Arc<Mutex<MissionReport>>,
    last_feedback: Option<Feedback>,
}

impl<T: RobotTransport> NavigatorNode<T, NullTelemetry> {
    /// Create a navigator without telemetry
    pub fn new(config: NavConfig, plan: MissionPlan, transport: T) -> NavResult<Self> {
        Self::with_telemetry(config, plan, transport, NullTelemetry)
    }
}

impl<T: RobotTransport, S: TelemetrySink> NavigatorNode<T, S> {
    /// Create a navigator that records every tick into `telemetry`
    pub fn with_telemetry(
        config: NavConfig,
        plan: MissionPlan,
        transport: T,
        telemetry: S,
    ) -> NavResult<Self> {
        let initial_pose = plan.initial_pose;
        let control = ControlLoop::new(config, plan)?;
        let report = MissionReport::new(control.state(), initial_pose);
        Ok(Self {
            control,
            transport,
            telemetry,
            halt: HaltSignal::new(),
            cancel: CancelToken::new(),
            report: Arc::new(Mutex::new(report)),
            last_feedback: None,
        })
    }

    /// Use an externally owned halt signal (chainable)
    pub fn with_halt_signal(mut self, halt: HaltSignal) -> Self {
        self.halt = halt;
        self
    }

    /// Use an externally owned cancel token (chainable)
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Shared report, updated after every tick and readable after the node
    /// has been handed to a scheduler
    pub fn report_handle(&self) -> Arc<Mutex<MissionReport>> {
        self.report.clone()
    }

    pub fn report(&self) -> MissionReport {
        self.report.lock().clone()
    }

    pub fn control(&self) -> &ControlLoop {
        &self.control
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn read_inputs(&mut self, dt: f64) -> NavResult<TickInputs> {
        let halted = self.halt.is_raised();
        Ok(TickInputs {
            raw_pose: self.transport.read_position()?,
            proximity: self.transport.read_proximity()?,
            bumpers: self.transport.read_bumpers()?,
            dt,
            halted,
        })
    }

    fn run_tick(&mut self, dt: f64) -> NavResult<TickOutput> {
        let inputs = self.read_inputs(dt)?;
        let output = self.control.step(&inputs)?;
        self.transport
            .set_wheel_speeds(output.command.v_left, output.command.v_right)?;
        if self.last_feedback != Some(output.feedback) {
            self.transport.show_feedback(output.feedback)?;
            self.last_feedback = Some(output.feedback);
        }
        Ok(output)
    }

    fn publish_report(&self) {
        *self.report.lock() = self.control.report();
    }

    /// Stop the wheels, mark the mission aborted and stop the scheduler
    fn fail(&mut self, error: &NavError, ctx: Option<&mut NodeInfo>) {
        if let Err(stop_error) = self.transport.stop() {
            tracing::error!(error = %stop_error, "could not command zero wheel speeds");
        }
        self.control.abort(AbortReason::HardwareFault);
        self.publish_report();
        match ctx {
            Some(ctx) => {
                ctx.transition_to_error(format!("navigation aborted: {}", error));
                ctx.request_stop();
            }
            None => tracing::error!(%error, "navigation aborted"),
        }
    }

    fn cancel_mission(&mut self, ctx: Option<&mut NodeInfo>) {
        if let Err(error) = self.transport.stop() {
            tracing::error!(%error, "could not command zero wheel speeds on cancel");
        }
        if self.control.abort(AbortReason::Cancelled) {
            tracing::info!(ticks = self.control.report().ticks, "mission cancelled");
        }
        self.publish_report();
        if let Some(ctx) = ctx {
            ctx.request_stop();
        }
    }
}

impl<T: RobotTransport, S: TelemetrySink> Node for NavigatorNode<T, S> {
    fn name(&self) -> &'static str {
        "NavigatorNode"
    }

    fn init(&mut self, ctx: &mut NodeInfo) -> NavResult<()> {
        let config = self.control.config();
        ctx.log_info(&format!(
            "mission start: {} law, dt {:.3} s, v_max {:.1} cm/s",
            config.attractive.name(),
            config.control.dt,
            config.governor.v_max
        ));
        self.transport.stop()
    }

    fn tick(&mut self, mut ctx: Option<&mut NodeInfo>) {
        if self.cancel.is_cancelled() {
            self.cancel_mission(ctx);
            return;
        }

        let dt = ctx
            .as_ref()
            .map(|c| c.tick_interval().as_secs_f64())
            .unwrap_or(self.control.config().control.dt);

        let output = match self.run_tick(dt) {
            Ok(output) => output,
            Err(error) => {
                self.fail(&error, ctx);
                return;
            }
        };

        self.telemetry.record(&output.record);
        if let Some(ctx) = ctx.as_deref_mut() {
            ctx.log_record("telemetry", &output.record);
        }
        self.publish_report();

        if output.state.is_terminal() {
            let report = self.control.report();
            match output.state {
                MissionState::Done => tracing::info!(
                    ticks = report.ticks,
                    traveled = report.distance_traveled,
                    collisions = report.collisions,
                    "mission complete"
                ),
                _ => tracing::warn!(state = %output.state, ticks = report.ticks, "mission ended"),
            }
            if let Some(ctx) = ctx {
                ctx.request_stop();
            }
        }
    }

    fn shutdown(&mut self, ctx: &mut NodeInfo) -> NavResult<()> {
        let stopped = self.transport.stop();
        self.telemetry.flush();
        self.publish_report();
        ctx.log_info(&format!("navigator stopped in state {}", self.control.state()));
        stopped
    }
}
