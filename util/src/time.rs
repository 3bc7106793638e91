//! General time utility functions

use chrono::{DateTime, Duration, Utc};
use std::{cell::Cell, time::Instant};

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of the current time.
///
/// Everything that makes timing decisions takes the time from a clock rather than calling
/// `Utc::now()` directly, so that it can be driven by a [`SimClock`] in tests.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The system clock.
///
/// The wall time is read once, when the clock is created, and advanced from then on by a
/// monotonic timer. Stepping the wall clock afterwards (NTP, the operator) has no effect on the
/// times this clock gives out.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start_utc: DateTime<Utc>,
    start: Instant,
}

/// Keeps a series of times from going backwards.
///
/// Whenever a time earlier than the previous one is seen the difference is added to every time
/// from then on, so the series pauses at the step rather than reversing.
#[derive(Debug, Clone, Default)]
pub struct Monotonic {
    last_raw: Option<DateTime<Utc>>,
    offset: Duration,
}

/// A manually advanced clock.
#[derive(Debug, Clone)]
pub struct SimClock {
    now: Cell<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SystemClock {
    /// Create a clock starting at the current wall time.
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Create a clock which reads `start_utc` now.
    pub fn anchored_at(start_utc: DateTime<Utc>) -> Self {
        Self {
            start_utc,
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        // Only out of range after centuries of uptime
        let elapsed =
            Duration::from_std(self.start.elapsed()).unwrap_or_else(|_| Duration::zero());

        self.start_utc + elapsed
    }
}

impl Monotonic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `raw` onto the series, the result is never earlier than any previous result.
    pub fn adjust(&mut self, raw: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(last) = self.last_raw {
            if raw < last {
                self.offset = self.offset + (last - raw);
            }
        }
        self.last_raw = Some(raw);

        raw + self.offset
    }
}

impl SimClock {
    /// Create a clock stopped at the given time.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Move the clock forward by the given duration.
    pub fn advance(&self, by: Duration) -> DateTime<Utc> {
        let t = self.now.get() + by;
        self.now.set(t);
        t
    }

    /// Move the clock forward by a number of milliseconds.
    pub fn advance_ms(&self, ms: i64) -> DateTime<Utc> {
        self.advance(Duration::milliseconds(ms))
    }
}

impl Default for SimClock {
    /// A clock starting at the unix epoch.
    fn default() -> Self {
        Self::starting_at(DateTime::<Utc>::from(std::time::UNIX_EPOCH))
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Number of seconds from `start` to `end`, `NaN` if the span can't be represented.
pub fn seconds_between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> f64 {
    duration_to_seconds(*end - *start).unwrap_or(std::f64::NAN)
}

/// Convert a count of milliseconds from a parameter file into a duration.
pub fn millis(ms: u64) -> Duration {
    Duration::milliseconds(ms as i64)
}
