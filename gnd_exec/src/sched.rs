//! # Scheduler
//!
//! Timers for the executive loop. Tasks are either repeating (the telemetry poll, the gamepad
//! frame) or one-shot (releasing a control after its feedback window). Every task gets a
//! [`TaskHandle`] which can be used to cancel it.
//!
//! The scheduler never reads the time itself, it is told the current time by the caller, so tests
//! can drive it from a simulated clock.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Duration, Utc};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle to a scheduled task.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

/// A set of scheduled tasks.
#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
}

#[derive(Debug)]
struct Entry<T> {
    id: u64,
    deadline: DateTime<Utc>,
    period: Option<Duration>,
    task: T,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Schedule a task to run at `first` and every `period` after that.
    ///
    /// Periods shorter than a millisecond are raised to one millisecond.
    pub fn every(&mut self, first: DateTime<Utc>, period: Duration, task: T) -> TaskHandle {
        let period = std::cmp::max(period, Duration::milliseconds(1));
        self.push(first, Some(period), task)
    }

    /// Schedule a task to run once after `delay` has passed.
    ///
    /// A zero delay runs the task on the next call to [`Scheduler::due`].
    pub fn after(&mut self, now: DateTime<Utc>, delay: Duration, task: T) -> TaskHandle {
        self.push(now + delay, None, task)
    }

    /// Cancel a task, returning `true` if it was still scheduled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let len = self.entries.len();
        self.entries.retain(|e| e.id != handle.0);
        self.entries.len() != len
    }

    /// Cancel every task.
    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Whether the task is still scheduled.
    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.entries.iter().any(|e| e.id == handle.0)
    }

    /// Number of scheduled tasks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest deadline of any scheduled task.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    /// Take all the tasks due at `now`, in deadline order.
    ///
    /// One-shot tasks are removed. Repeating tasks run at most once per call and are re-armed on
    /// their own period grid, so periods missed while the loop was busy are skipped rather than
    /// run in a burst.
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<T> {
        let mut ready: Vec<(DateTime<Utc>, u64, T)> = self
            .entries
            .iter()
            .filter(|e| e.deadline <= now)
            .map(|e| (e.deadline, e.id, e.task.clone()))
            .collect();

        ready.sort_by_key(|(deadline, id, _)| (*deadline, *id));

        self.entries
            .retain(|e| e.deadline > now || e.period.is_some());

        for e in self.entries.iter_mut() {
            if let Some(period) = e.period {
                while e.deadline <= now {
                    e.deadline = e.deadline + period;
                }
            }
        }

        ready.into_iter().map(|(_, _, task)| task).collect()
    }

    fn push(&mut self, deadline: DateTime<Utc>, period: Option<Duration>, task: T) -> TaskHandle {
        let id = self.next_id;
        self.next_id += 1;

        self.entries.push(Entry {
            id,
            deadline,
            period,
            task,
        });

        TaskHandle(id)
    }
}

impl<T: Clone> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
