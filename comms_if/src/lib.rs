//! # Communications interface crate.
//!
//! Provides the wire contracts shared between the ground control panel and the rover's web
//! server, along with the network transport used to reach it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator commands and their `/command` request bodies
pub mod tc;

/// Telemetry records returned by `/api/data` and `/api/history`
pub mod tm;

/// Network module
pub mod net;
