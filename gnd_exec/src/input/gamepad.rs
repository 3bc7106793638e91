//! # Gamepad sampling
//!
//! The gamepad is sampled once per frame while one is connected. Buttons are edge triggered,
//! except the D-pad which repeats while held since movement is expected to be held. The left
//! stick is level triggered with change detection: a direction is issued when the stick leaves
//! the deadzone or swings to a different direction, and forgotten when it returns to the
//! deadzone.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use comms_if::tc::{Direction, LogicalCommand, Mode};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Edge-triggered button mapping (standard gamepad layout).
const EDGE_BUTTONS: [(usize, PadAction); 5] = [
    (0, PadAction::Mode(Mode::Autonomous)),
    (1, PadAction::Mode(Mode::Assisted)),
    (2, PadAction::PowerToggle),
    (3, PadAction::Mode(Mode::Manual)),
    (9, PadAction::Move(Direction::Stop)),
];

/// D-pad mapping, these repeat every frame while held.
const DPAD_BUTTONS: [(usize, Direction); 4] = [
    (12, Direction::Forward),
    (13, Direction::Backward),
    (14, Direction::Left),
    (15, Direction::Right),
];

/// Index of the left stick's horizontal axis, positive to the right.
const AXIS_X: usize = 0;

/// Index of the left stick's vertical axis, positive downwards.
const AXIS_Y: usize = 1;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something that can report the current state of a gamepad.
pub trait GamepadSource {
    /// The current state of the gamepad at `index`, or `None` if there isn't one.
    fn sample(&mut self, index: usize) -> Option<GamepadSample>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The state of a gamepad at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamepadSample {
    /// Pressed state of each button, by standard layout index.
    pub buttons: Vec<bool>,

    /// Axis values between -1 and +1, by standard layout index.
    pub axes: Vec<f64>,
}

/// A gamepad source holding the latest reported state of each pad.
///
/// Samples persist until replaced, so a button reported as pressed stays held across frames.
#[derive(Debug, Default)]
pub struct LatchedGamepad {
    pads: HashMap<usize, GamepadSample>,
}

/// Per-frame memory used for edge and change detection.
#[derive(Debug, Default)]
pub struct GamepadState {
    index: Option<usize>,
    prev_buttons: Vec<bool>,
    last_axis_dir: Option<Direction>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone)]
enum PadAction {
    Mode(Mode),
    Move(Direction),
    PowerToggle,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GamepadSample {
    fn pressed(&self, button: usize) -> bool {
        self.buttons.get(button).copied().unwrap_or(false)
    }

    fn axis(&self, axis: usize) -> f64 {
        self.axes.get(axis).copied().unwrap_or(0.0)
    }
}

impl LatchedGamepad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest state of a pad.
    pub fn set(&mut self, index: usize, sample: GamepadSample) {
        self.pads.insert(index, sample);
    }

    /// Forget a pad.
    pub fn remove(&mut self, index: usize) {
        self.pads.remove(&index);
    }
}

impl GamepadSource for LatchedGamepad {
    fn sample(&mut self, index: usize) -> Option<GamepadSample> {
        self.pads.get(&index).cloned()
    }
}

impl GamepadState {
    /// Start tracking a newly connected gamepad, replacing any previous one.
    pub fn connect(&mut self, index: usize) {
        info!("Gamepad {} connected", index);
        *self = Self {
            index: Some(index),
            ..Default::default()
        };
    }

    /// Stop tracking a gamepad if it's the one being tracked.
    pub fn disconnect(&mut self, index: usize) {
        if self.index == Some(index) {
            info!("Gamepad {} disconnected", index);
            *self = Self::default();
        }
    }

    /// Index of the tracked gamepad.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Process one frame's sample, returning the commands it produces.
    ///
    /// The power toggle is resolved against `displayed_power`, an unknown state counting as off.
    pub fn process(
        &mut self,
        sample: &GamepadSample,
        deadzone: f64,
        displayed_power: Option<bool>,
    ) -> Vec<LogicalCommand> {
        let mut cmds = Vec::new();

        // Buttons, fire on the not-pressed to pressed transition only
        for (button, action) in EDGE_BUTTONS.iter() {
            let was_pressed = self.prev_buttons.get(*button).copied().unwrap_or(false);
            if sample.pressed(*button) && !was_pressed {
                debug!("Gamepad button {} pressed", button);
                cmds.push(match action {
                    PadAction::Mode(m) => LogicalCommand::ModeChange(*m),
                    PadAction::Move(d) => LogicalCommand::Move(*d),
                    PadAction::PowerToggle => LogicalCommand::PowerSet {
                        on: !displayed_power.unwrap_or(false),
                    },
                });
            }
        }

        // D-pad, fires every frame it's held
        for (button, dir) in DPAD_BUTTONS.iter() {
            if sample.pressed(*button) {
                cmds.push(LogicalCommand::Move(*dir));
            }
        }

        self.prev_buttons = sample.buttons.clone();

        // Left stick
        match resolve_axis(sample.axis(AXIS_X), sample.axis(AXIS_Y), deadzone) {
            Some(dir) if self.last_axis_dir != Some(dir) => {
                debug!("Stick moved {}", dir);
                self.last_axis_dir = Some(dir);
                cmds.push(LogicalCommand::Move(dir));
            }
            Some(_) => (),
            None => self.last_axis_dir = None,
        }

        cmds
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Direction indicated by a stick position, or `None` inside the deadzone.
///
/// The axis with the larger deflection wins, ties going to the horizontal axis. The winning
/// deflection must strictly exceed the deadzone.
pub fn resolve_axis(x: f64, y: f64, deadzone: f64) -> Option<Direction> {
    let (magnitude, dir) = if x.abs() >= y.abs() {
        (
            x.abs(),
            if x > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            },
        )
    } else {
        (
            y.abs(),
            if y > 0.0 {
                Direction::Backward
            } else {
                Direction::Forward
            },
        )
    };

    if magnitude > deadzone {
        Some(dir)
    } else {
        None
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const DEADZONE: f64 = 0.4;

    fn buttons(pressed: &[usize]) -> GamepadSample {
        let mut buttons = vec![false; 17];
        for b in pressed {
            buttons[*b] = true;
        }
        GamepadSample {
            buttons,
            axes: vec![0.0; 4],
        }
    }

    fn stick(x: f64, y: f64) -> GamepadSample {
        GamepadSample {
            buttons: vec![false; 17],
            axes: vec![x, y, 0.0, 0.0],
        }
    }

    #[test]
    fn test_resolve_axis() {
        assert_eq!(resolve_axis(0.6, 0.1, DEADZONE), Some(Direction::Right));
        assert_eq!(resolve_axis(-0.6, 0.1, DEADZONE), Some(Direction::Left));
        assert_eq!(resolve_axis(0.1, -0.9, DEADZONE), Some(Direction::Forward));
        assert_eq!(resolve_axis(0.1, 0.5, DEADZONE), Some(Direction::Backward));
        assert_eq!(resolve_axis(0.2, 0.2, DEADZONE), None);
        assert_eq!(resolve_axis(0.4, 0.0, DEADZONE), None);
        assert_eq!(resolve_axis(f64::NAN, 0.0, DEADZONE), None);
    }

    #[test]
    fn test_power_button_fires_once_per_press() {
        let mut s = GamepadState::default();
        s.connect(0);

        let mut fired = 0;
        for _ in 0..3 {
            // Held for 10 frames then released for 5
            for _ in 0..10 {
                fired += s.process(&buttons(&[2]), DEADZONE, Some(false)).len();
            }
            for _ in 0..5 {
                assert!(s.process(&buttons(&[]), DEADZONE, Some(false)).is_empty());
            }
        }

        assert_eq!(fired, 3);
    }

    #[test]
    fn test_power_toggle_follows_display() {
        let mut s = GamepadState::default();
        s.connect(0);

        assert_eq!(
            s.process(&buttons(&[2]), DEADZONE, Some(true)),
            vec![LogicalCommand::PowerSet { on: false }]
        );
        s.process(&buttons(&[]), DEADZONE, Some(true));
        assert_eq!(
            s.process(&buttons(&[2]), DEADZONE, None),
            vec![LogicalCommand::PowerSet { on: true }]
        );
    }

    #[test]
    fn test_button_mapping() {
        let mut s = GamepadState::default();
        s.connect(0);

        assert_eq!(
            s.process(&buttons(&[0, 1, 3, 9]), DEADZONE, None),
            vec![
                LogicalCommand::ModeChange(Mode::Autonomous),
                LogicalCommand::ModeChange(Mode::Assisted),
                LogicalCommand::ModeChange(Mode::Manual),
                LogicalCommand::Move(Direction::Stop),
            ]
        );
    }

    #[test]
    fn test_dpad_repeats_while_held() {
        let mut s = GamepadState::default();
        s.connect(0);

        for _ in 0..4 {
            assert_eq!(
                s.process(&buttons(&[12]), DEADZONE, None),
                vec![LogicalCommand::Move(Direction::Forward)]
            );
        }
        assert_eq!(
            s.process(&buttons(&[15]), DEADZONE, None),
            vec![LogicalCommand::Move(Direction::Right)]
        );
    }

    #[test]
    fn test_stick_change_detection() {
        let mut s = GamepadState::default();
        s.connect(0);

        // Held right for several frames issues one command
        assert_eq!(
            s.process(&stick(0.6, 0.1), DEADZONE, None),
            vec![LogicalCommand::Move(Direction::Right)]
        );
        assert!(s.process(&stick(0.8, 0.0), DEADZONE, None).is_empty());
        assert!(s.process(&stick(0.7, -0.2), DEADZONE, None).is_empty());

        // Swinging to another direction issues immediately
        assert_eq!(
            s.process(&stick(0.1, -0.9), DEADZONE, None),
            vec![LogicalCommand::Move(Direction::Forward)]
        );

        // Releasing clears the memory so the same direction can fire again
        assert!(s.process(&stick(0.2, 0.2), DEADZONE, None).is_empty());
        assert_eq!(
            s.process(&stick(0.0, -0.9), DEADZONE, None),
            vec![LogicalCommand::Move(Direction::Forward)]
        );
    }

    #[test]
    fn test_disconnect_only_affects_tracked_pad() {
        let mut s = GamepadState::default();
        s.connect(1);
        s.disconnect(0);
        assert_eq!(s.index(), Some(1));
        s.disconnect(1);
        assert_eq!(s.index(), None);
    }

    #[test]
    fn test_latched_source_holds_state() {
        let mut pad = LatchedGamepad::new();
        assert_eq!(pad.sample(0), None);

        pad.set(0, buttons(&[2]));
        assert_eq!(pad.sample(0), Some(buttons(&[2])));
        assert_eq!(pad.sample(0), Some(buttons(&[2])));

        pad.remove(0);
        assert_eq!(pad.sample(0), None);
    }
}
