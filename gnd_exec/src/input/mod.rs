//! # Input Aggregator
//!
//! Merges the panel's discrete controls (buttons activated by pointer or keyboard, and the power
//! toggle switch) with the gamepad into a single stream of [`LogicalCommand`]s. No source has
//! priority over another, everything ends up at the same dispatcher.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod device;
mod gamepad;

pub use device::*;
pub use gamepad::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use comms_if::tc::{Direction, LogicalCommand, Mode};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A discrete control on the panel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
    Manual,
    Assisted,
    Autonomous,

    /// The power button, which toggles the displayed power state.
    Power,
}

/// A key pressed while a control has focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Key {
    Enter,
    Space,
    Other(String),
}

/// An input event from the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    /// Pointer (mouse or touch) pressed on a control.
    PointerDown { control: Control },

    /// Key pressed while a control has focus.
    KeyDown { control: Control, key: Key },

    /// The power toggle switch changed state.
    ToggleChanged { on: bool },

    GamepadConnected { index: usize },

    GamepadDisconnected { index: usize },
}

/// An entry in an input script, either an operator event or the new state of a gamepad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptEvent {
    Pad {
        pad: usize,

        #[serde(default)]
        buttons: Vec<bool>,

        #[serde(default)]
        axes: Vec<f64>,
    },
    Input(InputEvent),
}

#[derive(Debug, thiserror::Error)]
#[error("{0} is not a recognised control")]
pub struct UnknownControl(String);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Input aggregator state.
#[derive(Debug)]
pub struct InputAggregator {
    gamepad: GamepadState,
    deadzone: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Control {
    /// The command this control issues.
    ///
    /// The power button toggles `displayed_power`, an unknown state counting as off.
    pub fn command(&self, displayed_power: Option<bool>) -> LogicalCommand {
        match self {
            Control::Forward => LogicalCommand::Move(Direction::Forward),
            Control::Backward => LogicalCommand::Move(Direction::Backward),
            Control::Left => LogicalCommand::Move(Direction::Left),
            Control::Right => LogicalCommand::Move(Direction::Right),
            Control::Stop => LogicalCommand::Move(Direction::Stop),
            Control::Manual => LogicalCommand::ModeChange(Mode::Manual),
            Control::Assisted => LogicalCommand::ModeChange(Mode::Assisted),
            Control::Autonomous => LogicalCommand::ModeChange(Mode::Autonomous),
            Control::Power => LogicalCommand::PowerSet {
                on: !displayed_power.unwrap_or(false),
            },
        }
    }
}

impl FromStr for Control {
    type Err = UnknownControl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fwd" | "forward" => Ok(Control::Forward),
            "back" | "backward" => Ok(Control::Backward),
            "left" => Ok(Control::Left),
            "right" => Ok(Control::Right),
            "stop" => Ok(Control::Stop),
            "manual" => Ok(Control::Manual),
            "assisted" => Ok(Control::Assisted),
            "auto" | "autonomous" => Ok(Control::Autonomous),
            "power" => Ok(Control::Power),
            _ => Err(UnknownControl(s.to_string())),
        }
    }
}

impl Key {
    /// Whether the key activates a focused control.
    pub fn activates(&self) -> bool {
        matches!(self, Key::Enter | Key::Space)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "enter" | "return" => Key::Enter,
            "space" | " " => Key::Space,
            _ => Key::Other(s),
        }
    }
}

impl From<Key> for String {
    fn from(k: Key) -> Self {
        match k {
            Key::Enter => String::from("enter"),
            Key::Space => String::from("space"),
            Key::Other(s) => s,
        }
    }
}

impl FromStr for Key {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Key::from(s.to_string()))
    }
}

impl ScriptEvent {
    /// Apply the event, latching gamepad states into `pads` and returning operator events.
    pub fn apply(self, pads: &mut LatchedGamepad) -> Option<InputEvent> {
        match self {
            ScriptEvent::Pad { pad, buttons, axes } => {
                pads.set(pad, GamepadSample { buttons, axes });
                None
            }
            ScriptEvent::Input(e) => {
                if let InputEvent::GamepadDisconnected { index } = e {
                    pads.remove(index);
                }
                Some(e)
            }
        }
    }
}

impl InputAggregator {
    pub fn new(deadzone: f64) -> Self {
        Self {
            gamepad: GamepadState::default(),
            deadzone,
        }
    }

    /// Handle a discrete input event.
    ///
    /// `toggle_guard` is set while the power switch is being synchronised with the server, any
    /// change notification from the switch during that time is its own echo and is ignored.
    pub fn on_event(
        &mut self,
        event: &InputEvent,
        displayed_power: Option<bool>,
        toggle_guard: bool,
    ) -> Option<LogicalCommand> {
        match event {
            InputEvent::PointerDown { control } => Some(control.command(displayed_power)),
            InputEvent::KeyDown { control, key } => {
                if key.activates() {
                    Some(control.command(displayed_power))
                } else {
                    trace!("Ignoring {:?} on {:?}", key, control);
                    None
                }
            }
            InputEvent::ToggleChanged { on } => {
                if toggle_guard {
                    debug!("Ignoring power switch change while it is being synchronised");
                    None
                } else {
                    Some(LogicalCommand::PowerSet { on: *on })
                }
            }
            InputEvent::GamepadConnected { index } => {
                self.gamepad.connect(*index);
                None
            }
            InputEvent::GamepadDisconnected { index } => {
                self.gamepad.disconnect(*index);
                None
            }
        }
    }

    /// Sample the gamepad for one frame.
    ///
    /// Does nothing if no gamepad is connected.
    pub fn on_frame(
        &mut self,
        source: &mut dyn GamepadSource,
        displayed_power: Option<bool>,
    ) -> Vec<LogicalCommand> {
        let index = match self.gamepad.index() {
            Some(i) => i,
            None => return Vec::new(),
        };

        match source.sample(index) {
            Some(sample) => self.gamepad.process(&sample, self.deadzone, displayed_power),
            None => Vec::new(),
        }
    }

    /// Index of the connected gamepad, if any.
    pub fn gamepad_index(&self) -> Option<usize> {
        self.gamepad.index()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
