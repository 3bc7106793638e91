//! # Ground control panel library.
//!
//! This library holds the control panel's state reconciliation and command dispatch logic. None of
//! it touches the network or the terminal directly: requests are handed back to the caller as
//! [`net_worker::NetRequest`]s and display changes go through a [`render::RenderTarget`], so the
//! whole panel can be driven from tests with a simulated clock.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Best-effort results for fire-and-forget network calls
pub mod outcome;

/// Parameters for the ground executable
pub mod params;

/// Scheduled tasks with cancellable handles
pub mod sched;

/// Command dispatcher - serialises commands and debounces repeated sends per control
pub mod dispatcher;

/// Input aggregator - merges discrete controls and the gamepad into logical commands
pub mod input;

/// Telemetry normaliser - maps wire records onto canonical sensor readings
pub mod telemetry;

/// State reconciler - merges server state with the operator's optimistic mode changes
pub mod reconciler;

/// Renderer - formats display state and applies it to a render target
pub mod render;

/// Telemetry poller - periodic requests for the current rover state
pub mod poller;

/// Network worker - performs requests off the main loop
pub mod net_worker;

/// The control panel, wiring all the components together
pub mod panel;

/// Operator console - line based input
pub mod console;
