//! # Telemetry Poller
//!
//! Requests the rover's current state once per poll period and normalises the responses. A failed
//! poll is dropped, there's no retry or backoff, the next period simply polls again.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace};

use comms_if::{
    net::Transport,
    tm::{DataRecord, HistoryRecord},
};

use crate::{
    net_worker::NetRequest,
    outcome::{BestEffort, Ignored},
    telemetry::{HistorySeries, Normaliser, TelemetrySnapshot},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry poller state.
#[derive(Debug, Default)]
pub struct Poller {
    normaliser: Normaliser,

    /// Number of polls issued.
    pub num_polls: u64,

    /// Number of responses received.
    pub num_received: u64,

    /// Number of polls which failed.
    pub num_failed: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Poller {
    pub fn new(normaliser: Normaliser) -> Self {
        Self {
            normaliser,
            ..Default::default()
        }
    }

    /// Issue one poll.
    pub fn poll(&mut self) -> NetRequest {
        self.num_polls += 1;
        trace!("Poll {}", self.num_polls);
        NetRequest::Data
    }

    /// Handle the response to a poll, returning the normalised snapshot if there is one.
    pub fn on_data(&mut self, response: BestEffort<DataRecord>) -> Option<TelemetrySnapshot> {
        match response {
            Ok(rec) => {
                self.num_received += 1;
                Some(self.normaliser.snapshot(&rec))
            }
            Err(e) => {
                self.num_failed += 1;
                debug!("Skipping poll, {}", e);
                None
            }
        }
    }

    /// Handle a history response.
    pub fn on_history(&self, response: BestEffort<HistoryRecord>) -> Option<HistorySeries> {
        match response {
            Ok(rec) => Some(self.normaliser.history(&rec)),
            Err(e) => {
                debug!("Skipping history, {}", e);
                None
            }
        }
    }

    pub fn normaliser(&self) -> &Normaliser {
        &self.normaliser
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Get the current rover state from the server.
pub fn fetch(transport: &dyn Transport) -> BestEffort<DataRecord> {
    transport.get_data().map_err(Ignored::because)
}

/// Get the recorded history from the server.
pub fn fetch_history(transport: &dyn Transport) -> BestEffort<HistoryRecord> {
    transport.get_history().map_err(Ignored::because)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
