//! # Telecommand module
//!
//! This module provides the logical commands an operator can issue to the rover, and their
//! serialisation into the body of a `POST /command` request.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Wire name of the mode change command.
const MODE_CHANGE: &str = "mode_change";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The JSON body of a `POST /command` request.
///
/// The `mode` field is only present for mode changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBody {
    /// The wire name of the command, e.g. `"forward"` or `"power_on"`
    pub command: String,

    /// The requested mode, only set for `"mode_change"`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mode: Option<String>,
}

/// Acknowledgement returned by the server for a command.
///
/// The content of the acknowledgement is not interpreted beyond being valid JSON. The default
/// acknowledgement is the empty object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ack(pub Value);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command issued by the operator.
///
/// Commands are created at the point of intent (a button press, a gamepad edge) and are consumed
/// once by the dispatcher.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LogicalCommand {
    /// Drive the rover in the given direction, or stop it.
    Move(Direction),

    /// Change the rover's operating mode.
    ModeChange(Mode),

    /// Switch the rover's power on or off.
    PowerSet { on: bool },
}

/// Direction of a movement command.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

/// Operating mode of the rover.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Manual,
    Assisted,
    Autonomous,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("{0} is not a recognised mode")]
    InvalidMode(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LogicalCommand {
    /// Build the request body for this command.
    pub fn to_body(&self) -> CommandBody {
        match self {
            LogicalCommand::Move(d) => CommandBody {
                command: d.as_str().to_string(),
                mode: None,
            },
            LogicalCommand::ModeChange(m) => CommandBody {
                command: MODE_CHANGE.to_string(),
                mode: Some(m.as_str().to_string()),
            },
            LogicalCommand::PowerSet { on } => CommandBody {
                command: String::from(if *on { "power_on" } else { "power_off" }),
                mode: None,
            },
        }
    }
}

impl Direction {
    /// The wire name of the direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Stop => "stop",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Mode {
    /// The wire name of the mode, as reported by the server in telemetry.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Manual => "manual",
            Mode::Assisted => "assisted",
            Mode::Autonomous => "autonomous",
        }
    }
}

impl FromStr for Mode {
    type Err = TcParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Mode::Manual),
            "assisted" => Ok(Mode::Assisted),
            "autonomous" | "auto" => Ok(Mode::Autonomous),
            _ => Err(TcParseError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Ack {
    fn default() -> Self {
        Ack(Value::Object(Default::default()))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mode_change_body() {
        let body = LogicalCommand::ModeChange(Mode::Assisted).to_body();
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"command":"mode_change","mode":"assisted"}"#
        );
    }

    #[test]
    fn test_move_and_power_bodies_have_no_mode() {
        let body = LogicalCommand::Move(Direction::Backward).to_body();
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"command":"backward"}"#
        );

        let body = LogicalCommand::PowerSet { on: false }.to_body();
        assert_eq!(body.command, "power_off");
        assert_eq!(body.mode, None);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!("auto".parse::<Mode>().unwrap(), Mode::Autonomous);
        assert_eq!(Mode::Assisted.to_string(), "assisted");
        assert!(matches!(
            "turbo".parse::<Mode>(),
            Err(TcParseError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_default_ack_is_empty_object() {
        assert_eq!(serde_json::to_string(&Ack::default()).unwrap(), "{}");
    }
}
