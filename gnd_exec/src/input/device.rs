//! # Physical gamepads
//!
//! Gamepads attached to the ground station, read through `gilrs`. Connection changes become
//! [`InputEvent`]s for the aggregator, and the button and axis state of a pad is reported in
//! standard layout order so it can be sampled like any other [`GamepadSource`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use gilrs::{Axis, Button, EventType, Gilrs};
use log::{info, trace};

use super::{GamepadSample, GamepadSource, InputEvent};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Buttons by standard layout index.
const BUTTONS: [Button; 17] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
    Button::Mode,
];

/// Axes by standard layout index, with whether the value is flipped.
///
/// `gilrs` reports stick Y as positive upwards.
const AXES: [(Axis, bool); 4] = [
    (Axis::LeftStickX, false),
    (Axis::LeftStickY, true),
    (Axis::RightStickX, false),
    (Axis::RightStickY, true),
];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Gamepads attached to this machine.
pub struct GilrsGamepad {
    gilrs: Gilrs,

    /// Connections found at start-up, `gilrs` doesn't raise events for these.
    pending: Vec<InputEvent>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GilrsGamepad {
    pub fn new() -> Result<Self, gilrs::Error> {
        let gilrs = Gilrs::new()?;

        let pending = gilrs
            .gamepads()
            .map(|(id, pad)| {
                info!("Found gamepad {:?} ({})", id, pad.name());
                InputEvent::GamepadConnected { index: id.into() }
            })
            .collect();

        Ok(Self { gilrs, pending })
    }

    /// Process everything `gilrs` has seen since the last call, returning connection changes.
    ///
    /// Must be called every cycle, pad state is only updated while events are processed.
    pub fn poll_events(&mut self) -> Vec<InputEvent> {
        let mut events = std::mem::take(&mut self.pending);

        while let Some(ev) = self.gilrs.next_event() {
            trace!("Gamepad event {:?}", ev);
            events.extend(connection_event(ev.id.into(), &ev.event));
        }

        events
    }
}

impl GamepadSource for GilrsGamepad {
    fn sample(&mut self, index: usize) -> Option<GamepadSample> {
        let (_, pad) = self
            .gilrs
            .gamepads()
            .find(|(id, _)| Into::<usize>::into(*id) == index)?;

        Some(sample_with(|b| pad.is_pressed(b), |a| pad.value(a)))
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// The input event for a `gilrs` event, if it's a connection change.
pub fn connection_event(index: usize, event: &EventType) -> Option<InputEvent> {
    match event {
        EventType::Connected => Some(InputEvent::GamepadConnected { index }),
        EventType::Disconnected => Some(InputEvent::GamepadDisconnected { index }),
        _ => None,
    }
}

/// Build a sample in standard layout order from a pad's button and axis state.
pub fn sample_with<P, V>(pressed: P, value: V) -> GamepadSample
where
    P: Fn(Button) -> bool,
    V: Fn(Axis) -> f32,
{
    GamepadSample {
        buttons: BUTTONS.iter().map(|b| pressed(*b)).collect(),
        axes: AXES
            .iter()
            .map(|(a, flip)| {
                let v = value(*a) as f64;
                if *flip {
                    -v
                } else {
                    v
                }
            })
            .collect(),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
