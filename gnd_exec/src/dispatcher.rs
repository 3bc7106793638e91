//! # Command Dispatcher
//!
//! Serialises logical commands into `POST /command` requests and prevents the same control being
//! sent twice while its press feedback is still showing.
//!
//! Debouncing is per [`ControlId`]. Once a control is dispatched it stays in flight for the
//! feedback window, whatever the network is doing, and further dispatches of that control are
//! dropped. The rover treats commands idempotently so a dropped repeat costs nothing.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace, warn};
use std::collections::HashSet;

use comms_if::{
    net::Transport,
    tc::{Ack, Direction, LogicalCommand, Mode},
};

use crate::outcome::{BestEffort, Ignored};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Identity of a control for debouncing.
///
/// Every input source maps its commands onto the same ids, so a movement button and the D-pad
/// direction it mirrors share one feedback window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ControlId {
    Move(Direction),
    Mode(Mode),
    Power,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Command dispatcher state.
#[derive(Debug, Default)]
pub struct Dispatcher {
    in_flight: HashSet<ControlId>,

    /// Number of commands accepted for sending.
    pub num_accepted: u64,

    /// Number of commands dropped because their control was in flight.
    pub num_debounced: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ControlId {
    /// The control a command belongs to.
    pub fn of(cmd: &LogicalCommand) -> Self {
        match cmd {
            LogicalCommand::Move(d) => ControlId::Move(*d),
            LogicalCommand::ModeChange(m) => ControlId::Mode(*m),
            LogicalCommand::PowerSet { .. } => ControlId::Power,
        }
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to start dispatching a command.
    ///
    /// Returns the control that is now in flight, or `None` if that control is already in flight
    /// and the command must be dropped. The caller is responsible for calling
    /// [`Dispatcher::release`] once the feedback window has elapsed.
    pub fn try_begin(&mut self, cmd: &LogicalCommand) -> Option<ControlId> {
        let id = ControlId::of(cmd);

        if self.in_flight.insert(id) {
            self.num_accepted += 1;
            debug!("Dispatching {:?}", cmd);
            Some(id)
        } else {
            self.num_debounced += 1;
            trace!("{:?} already in flight, dropping {:?}", id, cmd);
            None
        }
    }

    /// Release a control at the end of its feedback window.
    pub fn release(&mut self, id: ControlId) {
        self.in_flight.remove(&id);
    }

    /// Release every control.
    pub fn release_all(&mut self) {
        self.in_flight.clear();
    }

    /// Whether the control is in flight.
    pub fn is_in_flight(&self, id: ControlId) -> bool {
        self.in_flight.contains(&id)
    }
}

/// Send a command to the server.
///
/// Any failure is logged and turned into [`Ignored`], the next telemetry poll shows the real state
/// of the rover.
pub fn send(transport: &dyn Transport, cmd: &LogicalCommand) -> BestEffort<Ack> {
    transport.post_command(&cmd.to_body()).map_err(|e| {
        warn!("Command {:?} not delivered: {}", cmd, e);
        Ignored::because(e)
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
