//! # Network Worker
//!
//! Requests to the server are blocking, so they're performed on short-lived threads rather than on
//! the executive loop. Each request's completion is sent back over a channel which the loop drains
//! once per cycle, so completions are handled on the main thread in the order they arrive.
//!
//! Nothing is cancelled: a request outlives any change of mind by the operator and its completion
//! is still applied.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{trace, warn};
use std::{
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread,
    time::Duration,
};

use comms_if::{
    net::Transport,
    tc::{Ack, LogicalCommand},
    tm::{DataRecord, HistoryRecord},
};

use crate::{dispatcher, outcome::BestEffort, poller};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A request to the server.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NetRequest {
    Command(LogicalCommand),
    Data,
    History,
}

/// The completion of a [`NetRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum NetCompletion {
    Command {
        cmd: LogicalCommand,
        result: BestEffort<Ack>,
    },
    Data(BestEffort<DataRecord>),
    History(BestEffort<HistoryRecord>),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Performs requests on background threads.
pub struct NetWorker {
    transport: Arc<dyn Transport>,
    tx: Sender<NetCompletion>,
    rx: Receiver<NetCompletion>,

    /// Number of requests submitted.
    pub num_submitted: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NetWorker {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (tx, rx) = mpsc::channel();

        Self {
            transport,
            tx,
            rx,
            num_submitted: 0,
        }
    }

    /// Start performing a request.
    pub fn submit(&mut self, req: NetRequest) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();

        self.num_submitted += 1;
        trace!("Submitting {:?}", req);

        let spawned = thread::Builder::new()
            .name(String::from("net"))
            .spawn(move || {
                // The receiver is only gone at shutdown, when nobody wants the result anyway
                tx.send(perform(transport.as_ref(), req)).ok();
            });

        if let Err(e) = spawned {
            warn!("Could not start request {:?}: {}", req, e);
        }
    }

    /// Take every completion that has arrived, in arrival order.
    pub fn drain(&self) -> Vec<NetCompletion> {
        self.rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next completion.
    pub fn wait(&self, timeout: Duration) -> Option<NetCompletion> {
        self.rx.recv_timeout(timeout).ok()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Perform a request on the current thread.
pub fn perform(transport: &dyn Transport, req: NetRequest) -> NetCompletion {
    match req {
        NetRequest::Command(cmd) => NetCompletion::Command {
            cmd,
            result: dispatcher::send(transport, &cmd),
        },
        NetRequest::Data => NetCompletion::Data(poller::fetch(transport)),
        NetRequest::History => NetCompletion::History(poller::fetch_history(transport)),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{
        net::{reqwest::StatusCode, TransportError},
        tc::{CommandBody, Direction},
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockTransport {
        posted: Mutex<Vec<CommandBody>>,
    }

    impl Transport for MockTransport {
        fn post_command(&self, body: &CommandBody) -> Result<Ack, TransportError> {
            self.posted.lock().unwrap().push(body.clone());
            Ok(Ack::default())
        }

        fn get_data(&self) -> Result<DataRecord, TransportError> {
            Ok(DataRecord {
                power: Some(true),
                ..Default::default()
            })
        }

        fn get_history(&self) -> Result<HistoryRecord, TransportError> {
            Err(TransportError::StatusError(
                String::from("/api/history"),
                StatusCode::NOT_FOUND,
            ))
        }
    }

    #[test]
    fn test_perform() {
        let t = MockTransport::default();
        let fwd = LogicalCommand::Move(Direction::Forward);

        assert_eq!(
            perform(&t, NetRequest::Command(fwd)),
            NetCompletion::Command {
                cmd: fwd,
                result: Ok(Ack::default())
            }
        );
        assert_eq!(t.posted.lock().unwrap()[0].command, "forward");

        match perform(&t, NetRequest::History) {
            NetCompletion::History(Err(e)) => assert!(e.reason.contains("404")),
            c => panic!("Unexpected completion {:?}", c),
        }
    }

    #[test]
    fn test_completions_return_to_caller() {
        let mut w = NetWorker::new(Arc::new(MockTransport::default()));

        w.submit(NetRequest::Data);

        match w.wait(Duration::from_secs(5)) {
            Some(NetCompletion::Data(Ok(rec))) => assert_eq!(rec.power, Some(true)),
            c => panic!("Unexpected completion {:?}", c),
        }
        assert!(w.drain().is_empty());
        assert_eq!(w.num_submitted, 1);
    }
}
