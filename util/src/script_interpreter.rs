//! # Input script interpreter module
//!
//! This module provides an interpreter for timed input scripts, allowing an operator session to be
//! replayed without anyone at the controls. A script is a sequence of entries of the form
//!
//! ```text
//! <time_s>: <json>;
//! ```
//!
//! where the JSON payload is decoded into the caller's event type. Entries fire once the elapsed
//! time passes their timestamp. Anything outside an entry (such as `#` comment lines) is ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An event which is scripted to occur at a specific time.
struct Entry<E> {
    /// The time the event is supposed to fire at
    exec_time_s: f64,

    /// The event to fire
    event: E,
}

/// A script interpreter.
///
/// After loading the script use `.get_pending()` to acquire the events that are due.
pub struct ScriptInterpreter<E> {
    script_path: Option<PathBuf>,
    entries: VecDeque<Entry<E>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)"
    )]
    InvalidTimestamp(String),

    #[error("Script contains an invalid event at {0} s: {1}")]
    InvalidEvent(f64, serde_json::Error),
}

/// Result of polling the interpreter.
#[derive(Debug, PartialEq)]
pub enum Pending<E> {
    None,
    Some(Vec<E>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<E: DeserializeOwned> ScriptInterpreter<E> {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());

        // Check that the script file exists.
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        // Load the script into a string
        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let mut si = Self::from_str(&script)?;
        si.script_path = Some(path);

        Ok(si)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let mut entries: VecDeque<Entry<E>> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("script regex is valid");

        for cap in re.captures_iter(script) {
            // Parse the exec time, groups 1 and 3 always take part in a match
            let exec_time_s: f64 = cap[1]
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            // Parse the event from the payload. The scripts contain JSON only.
            let event = serde_json::from_str(&cap[3])
                .map_err(|e| ScriptError::InvalidEvent(exec_time_s, e))?;

            entries.push_back(Entry { exec_time_s, event });
        }

        if entries.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        // Entries are not required to be written in order
        entries
            .make_contiguous()
            .sort_by(|a, b| a.exec_time_s.total_cmp(&b.exec_time_s));

        Ok(ScriptInterpreter {
            script_path: None,
            entries,
        })
    }
}

impl<E> ScriptInterpreter<E> {
    /// Return the events which are due at the given elapsed time.
    pub fn get_pending(&mut self, elapsed_s: f64) -> Pending<E> {
        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.entries.is_empty() {
            return Pending::EndOfScript;
        }

        let mut due = vec![];

        // Pop entries from the head of the queue until the exec times are
        // larger than the current time.
        while self
            .entries
            .front()
            .map_or(false, |e| e.exec_time_s <= elapsed_s)
        {
            if let Some(e) = self.entries.pop_front() {
                due.push(e.event);
            }
        }

        if due.is_empty() {
            Pending::None
        } else {
            Pending::Some(due)
        }
    }

    /// Get the number of events left in the script
    pub fn get_num_events(&self) -> usize {
        self.entries.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.entries.back() {
            Some(e) => e.exec_time_s,
            None => 0f64,
        }
    }

    /// Path the script was loaded from, if any.
    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }
}
