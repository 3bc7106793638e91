//! # Control Panel
//!
//! Wires the input aggregator, dispatcher, poller, reconciler and renderer together behind three
//! entry points, called from the executive loop:
//!
//! - [`Panel::handle_input`] for operator input events,
//! - [`Panel::handle_completion`] for finished network requests,
//! - [`Panel::tick`] once per cycle to run whatever tasks are due.
//!
//! The panel never performs a request itself. Each entry point returns the [`NetRequest`]s it
//! wants made and the caller hands them to the network worker. All times are supplied by the
//! caller. A time earlier than one already seen is treated as no time passing, so a clock stepped
//! backwards can't stall polling or leave controls stuck in flight.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, trace};

use comms_if::tc::LogicalCommand;
use util::time::Monotonic;

use crate::{
    dispatcher::{ControlId, Dispatcher},
    input::{GamepadSource, InputAggregator, InputEvent},
    net_worker::{NetCompletion, NetRequest},
    params::GndExecParams,
    poller::Poller,
    reconciler::{DisplayState, Reconciler},
    render::{HistorySummary, RenderTarget, Renderer},
    sched::{Scheduler, TaskHandle},
    telemetry::{AirQualityScale, Normaliser},
};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Work scheduled by the panel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Task {
    /// Request the rover's current state.
    Poll,

    /// Sample the gamepad.
    Frame,

    /// Request the telemetry history.
    History,

    /// End a control's feedback window.
    Release(ControlId),

    /// Stop ignoring the power switch.
    ClearToggleGuard,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The control panel.
pub struct Panel<R: RenderTarget> {
    time: Monotonic,
    sched: Scheduler<Task>,
    guard_handle: Option<TaskHandle>,

    feedback_window: Duration,
    frame_period: Duration,

    input: InputAggregator,
    dispatcher: Dispatcher,
    poller: Poller,
    reconciler: Reconciler,
    renderer: Renderer<R>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<R: RenderTarget> Panel<R> {
    /// Create a new panel drawing onto `target`.
    ///
    /// The first poll and a history request are due immediately.
    pub fn new(params: &GndExecParams, target: R, now: DateTime<Utc>) -> Self {
        let mut time = Monotonic::new();
        let now = time.adjust(now);

        let mut sched = Scheduler::new();
        sched.every(now, params.poll_period(), Task::Poll);
        sched.every(now, params.frame_period(), Task::Frame);
        sched.after(now, Duration::zero(), Task::History);

        let scale = AirQualityScale {
            max_raw: params.air_quality_max_raw,
            ppm_scale: params.air_quality_ppm_scale,
        };

        let mut panel = Self {
            time,
            sched,
            guard_handle: None,
            feedback_window: params.feedback_window(),
            frame_period: params.frame_period(),
            input: InputAggregator::new(params.stick_deadzone),
            dispatcher: Dispatcher::new(),
            poller: Poller::new(Normaliser::new(scale)),
            reconciler: Reconciler::new(params.override_ttl()),
            renderer: Renderer::new(target),
        };

        panel.render();

        panel
    }

    /// Handle an operator input event.
    pub fn handle_input(&mut self, event: &InputEvent, now: DateTime<Utc>) -> Vec<NetRequest> {
        trace!("Input {:?}", event);
        let now = self.time.adjust(now);

        let cmd = self.input.on_event(
            event,
            self.reconciler.display().power,
            self.reconciler.toggle_guard(),
        );

        cmd.and_then(|c| self.issue(c, now)).into_iter().collect()
    }

    /// Run every task that is due.
    pub fn tick(&mut self, gamepad: &mut dyn GamepadSource, now: DateTime<Utc>) -> Vec<NetRequest> {
        let now = self.time.adjust(now);
        let mut reqs = Vec::new();

        for task in self.sched.due(now) {
            match task {
                Task::Poll => reqs.push(self.poller.poll()),
                Task::History => reqs.push(self.request_history()),
                Task::Frame => {
                    let cmds = self
                        .input
                        .on_frame(gamepad, self.reconciler.display().power);

                    for cmd in cmds {
                        reqs.extend(self.issue(cmd, now));
                    }
                }
                Task::Release(id) => {
                    self.dispatcher.release(id);
                    self.renderer.set_pressed(id, false);
                }
                Task::ClearToggleGuard => {
                    self.reconciler.clear_toggle_guard();
                    self.guard_handle = None;
                }
            }
        }

        reqs
    }

    /// Handle a finished network request.
    pub fn handle_completion(&mut self, completion: NetCompletion, now: DateTime<Utc>) {
        let now = self.time.adjust(now);

        match completion {
            NetCompletion::Command { cmd, result } => match result {
                Ok(ack) => trace!("{:?} acknowledged with {}", cmd, ack.0),
                // Already reported by the dispatcher
                Err(_) => (),
            },
            NetCompletion::Data(response) => {
                if let Some(snapshot) = self.poller.on_data(response) {
                    let power_before = self.reconciler.display().power;
                    self.reconciler.apply_snapshot(&snapshot, now);

                    // Each sync of the switch gets a full frame of guard
                    if self.reconciler.display().power != power_before
                        && self.reconciler.toggle_guard()
                    {
                        if let Some(h) = self.guard_handle.take() {
                            self.sched.cancel(h);
                        }
                        self.guard_handle = Some(self.sched.after(
                            now,
                            self.frame_period,
                            Task::ClearToggleGuard,
                        ));
                    }

                    self.render();
                }
            }
            NetCompletion::History(response) => {
                if let Some(history) = self.poller.on_history(response) {
                    let summary = HistorySummary::of(&history, &self.poller.normaliser().scale);
                    self.renderer.history(&summary);
                }
            }
        }
    }

    /// Request the telemetry history.
    pub fn request_history(&mut self) -> NetRequest {
        debug!("Requesting history");
        NetRequest::History
    }

    /// Cancel every scheduled task.
    pub fn shutdown(&mut self) {
        if let Some(h) = self.guard_handle.take() {
            self.sched.cancel(h);
        }
        self.sched.cancel_all();
        self.dispatcher.release_all();

        info!(
            "Panel stopped: {} commands sent ({} debounced), {} polls ({} failed), {} mode \
            changes confirmed ({} expired)",
            self.dispatcher.num_accepted,
            self.dispatcher.num_debounced,
            self.poller.num_polls,
            self.poller.num_failed,
            self.reconciler.num_confirmed,
            self.reconciler.num_expired
        );
    }

    pub fn display(&self) -> &DisplayState {
        self.reconciler.display()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn renderer(&self) -> &Renderer<R> {
        &self.renderer
    }

    /// Number of scheduled tasks.
    pub fn num_scheduled(&self) -> usize {
        self.sched.len()
    }

    /// Debounce a command and, if it goes ahead, start its feedback window.
    fn issue(&mut self, cmd: LogicalCommand, now: DateTime<Utc>) -> Option<NetRequest> {
        let id = self.dispatcher.try_begin(&cmd)?;

        if let LogicalCommand::ModeChange(mode) = cmd {
            self.reconciler.seed_override(mode, now);
            self.render();
        }

        self.sched
            .after(now, self.feedback_window, Task::Release(id));
        self.renderer.set_pressed(id, true);

        Some(NetRequest::Command(cmd))
    }

    fn render(&mut self) {
        self.renderer.update(self.reconciler.display());
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
