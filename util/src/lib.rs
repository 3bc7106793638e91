//! Utility library for the rover ground control panel

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
pub mod logger;
pub mod params;
pub mod session;
pub mod script_interpreter;
pub mod time;
