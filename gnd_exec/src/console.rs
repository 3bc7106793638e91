//! # Operator Console
//!
//! Line based stand-in for the panel's buttons. Each line is parsed into the input event the
//! equivalent widget would produce, for example `fwd` is a pointer-down on the forward button and
//! `power on` moves the power switch.
//!
//! Lines are read on their own thread, since reading blocks, and parsed actions are passed back
//! over a channel.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{error, warn};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::{
    str::FromStr,
    sync::mpsc::{self, Receiver, Sender},
    thread,
};
use structopt::{clap::AppSettings, StructOpt};

use comms_if::tc::Mode;

use crate::input::{Control, InputEvent, Key};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PROMPT: &str = "Rover $ ";

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A console command.
#[derive(Debug, StructOpt)]
#[structopt(name = "console", setting = AppSettings::NoBinaryName)]
pub enum ConsoleCmd {
    /// Press the forward button
    #[structopt(name = "fwd", alias = "forward")]
    Forward,

    /// Press the backward button
    #[structopt(name = "back", alias = "backward")]
    Backward,

    /// Press the left button
    #[structopt(name = "left")]
    Left,

    /// Press the right button
    #[structopt(name = "right")]
    Right,

    /// Press the stop button
    #[structopt(name = "stop")]
    Stop,

    /// Press a key while a control has focus
    #[structopt(name = "key")]
    Key {
        /// The focused control, e.g. `fwd` or `power`
        control: Control,

        /// The key, `enter` and `space` activate the control
        key: Key,
    },

    /// Press a mode button
    #[structopt(name = "mode")]
    Mode {
        /// One of `manual`, `assisted` or `autonomous`
        mode: Mode,
    },

    /// Move the power switch
    #[structopt(name = "power")]
    Power {
        /// `on` or `off`
        state: Switch,
    },

    /// Press the power toggle button
    #[structopt(name = "toggle")]
    Toggle,

    /// Show the telemetry history
    #[structopt(name = "history")]
    History,

    /// Exit the panel
    #[structopt(name = "quit", alias = "exit")]
    Quit,
}

/// Position of the power switch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

/// An action requested at the console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleAction {
    Input(InputEvent),
    History,
    Quit,
}

#[derive(Debug, thiserror::Error)]
#[error("Expected on or off, found {0}")]
pub struct SwitchParseError(String);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FromStr for Switch {
    type Err = SwitchParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Switch::On),
            "off" => Ok(Switch::Off),
            _ => Err(SwitchParseError(s.to_string())),
        }
    }
}

impl From<ConsoleCmd> for ConsoleAction {
    fn from(cmd: ConsoleCmd) -> Self {
        let press = |control| ConsoleAction::Input(InputEvent::PointerDown { control });

        match cmd {
            ConsoleCmd::Forward => press(Control::Forward),
            ConsoleCmd::Backward => press(Control::Backward),
            ConsoleCmd::Left => press(Control::Left),
            ConsoleCmd::Right => press(Control::Right),
            ConsoleCmd::Stop => press(Control::Stop),
            ConsoleCmd::Key { control, key } => {
                ConsoleAction::Input(InputEvent::KeyDown { control, key })
            }
            ConsoleCmd::Mode { mode } => press(match mode {
                Mode::Manual => Control::Manual,
                Mode::Assisted => Control::Assisted,
                Mode::Autonomous => Control::Autonomous,
            }),
            ConsoleCmd::Power { state } => ConsoleAction::Input(InputEvent::ToggleChanged {
                on: state == Switch::On,
            }),
            ConsoleCmd::Toggle => press(Control::Power),
            ConsoleCmd::History => ConsoleAction::History,
            ConsoleCmd::Quit => ConsoleAction::Quit,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse a console line.
pub fn parse(line: &str) -> Result<ConsoleAction, structopt::clap::Error> {
    ConsoleCmd::from_iter_safe(line.split_whitespace()).map(ConsoleAction::from)
}

/// Start reading the console on a new thread.
///
/// The channel closes once the operator quits or the console can no longer be read, a
/// [`ConsoleAction::Quit`] is always sent first.
pub fn spawn() -> std::io::Result<Receiver<ConsoleAction>> {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name(String::from("console"))
        .spawn(move || run(tx))?;

    Ok(rx)
}

fn run(tx: Sender<ConsoleAction>) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            error!("Could not open the console: {}", e);
            tx.send(ConsoleAction::Quit).ok();
            return;
        }
    };

    loop {
        let action = match rl.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str()).ok();

                match parse(&line) {
                    Ok(a) => a,
                    Err(e) => {
                        println!("{}", e.message);
                        continue;
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => ConsoleAction::Quit,
            Err(e) => {
                warn!("Console read failed: {}", e);
                ConsoleAction::Quit
            }
        };

        let quit = action == ConsoleAction::Quit;

        if tx.send(action).is_err() || quit {
            break;
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn input(line: &str) -> InputEvent {
        match parse(line).unwrap() {
            ConsoleAction::Input(e) => e,
            a => panic!("{} parsed to {:?}", line, a),
        }
    }

    #[test]
    fn test_movement() {
        assert_eq!(
            input("fwd"),
            InputEvent::PointerDown {
                control: Control::Forward
            }
        );
        assert_eq!(
            input("  back "),
            InputEvent::PointerDown {
                control: Control::Backward
            }
        );
        assert_eq!(
            input("stop"),
            InputEvent::PointerDown {
                control: Control::Stop
            }
        );
    }

    #[test]
    fn test_key_mode_and_power() {
        assert_eq!(
            input("key left space"),
            InputEvent::KeyDown {
                control: Control::Left,
                key: Key::Space
            }
        );
        assert_eq!(
            input("key power tab"),
            InputEvent::KeyDown {
                control: Control::Power,
                key: Key::Other("tab".into())
            }
        );
        assert_eq!(
            input("mode auto"),
            InputEvent::PointerDown {
                control: Control::Autonomous
            }
        );
        assert_eq!(input("power off"), InputEvent::ToggleChanged { on: false });
        assert_eq!(
            input("toggle"),
            InputEvent::PointerDown {
                control: Control::Power
            }
        );
    }

    #[test]
    fn test_other_actions() {
        assert_eq!(parse("history").unwrap(), ConsoleAction::History);
        assert_eq!(parse("exit").unwrap(), ConsoleAction::Quit);

        assert!(parse("warp 9").is_err());
        assert!(parse("mode turbo").is_err());
        assert!(parse("power maybe").is_err());
    }
}
