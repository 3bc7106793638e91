//! # Ground Executable Parameters
//!
//! This module provide parameters for the ground control panel. Every field has a default, so a
//! parameter file only needs to name the values it changes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Duration;
use serde::{Deserialize, Serialize};
use util::time::millis;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GndExecParams {
    /// Period between telemetry requests.
    ///
    /// Units: milliseconds
    pub poll_period_ms: u64,

    /// Period of the executive loop, which is also the gamepad sampling period (one display
    /// frame).
    ///
    /// Units: milliseconds
    pub frame_period_ms: u64,

    /// Time a control stays pressed after a dispatch, during which repeated sends of the same
    /// control are dropped.
    ///
    /// Units: milliseconds
    pub feedback_window_ms: u64,

    /// Lifetime of an unconfirmed optimistic mode change.
    ///
    /// Units: milliseconds
    pub override_ttl_ms: u64,

    /// Analog stick deflection that must be exceeded before a direction is issued.
    ///
    /// Units: normalised axis value (0 to 1)
    pub stick_deadzone: f64,

    /// Full-scale raw reading of the air quality ADC.
    pub air_quality_max_raw: f64,

    /// Concentration corresponding to a full-scale air quality reading.
    ///
    /// Units: parts per million
    pub air_quality_ppm_scale: f64,

    /// Minimum level of log messages, one of `info`, `debug` or `trace`.
    pub log_level: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GndExecParams {
    pub fn poll_period(&self) -> Duration {
        millis(self.poll_period_ms)
    }

    pub fn frame_period(&self) -> Duration {
        millis(self.frame_period_ms)
    }

    pub fn feedback_window(&self) -> Duration {
        millis(self.feedback_window_ms)
    }

    pub fn override_ttl(&self) -> Duration {
        millis(self.override_ttl_ms)
    }
}

impl Default for GndExecParams {
    fn default() -> Self {
        Self {
            poll_period_ms: 1000,
            frame_period_ms: 16,
            feedback_window_ms: 150,
            override_ttl_ms: 5000,
            stick_deadzone: 0.4,
            air_quality_max_raw: 32767.0,
            air_quality_ppm_scale: 1000.0,
            log_level: String::from("debug"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let p: GndExecParams =
            util::params::from_str("poll_period_ms = 500\nstick_deadzone = 0.25\n").unwrap();

        assert_eq!(p.poll_period(), Duration::milliseconds(500));
        assert_eq!(p.stick_deadzone, 0.25);
        assert_eq!(p.feedback_window(), Duration::milliseconds(150));
        assert_eq!(p.override_ttl(), Duration::milliseconds(5000));
        assert_eq!(p.air_quality_max_raw, 32767.0);
    }
}
