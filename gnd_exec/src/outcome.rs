//! # Best-effort outcomes
//!
//! Commands and telemetry requests are fire-and-forget: a failure is logged and the cycle skipped,
//! never retried or shown to the operator. [`BestEffort`] makes that policy part of the signature
//! instead of a silently discarded error.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Result of a best-effort operation.
pub type BestEffort<T> = Result<T, Ignored>;

/// A failure that has been deliberately ignored.
///
/// The reason is kept for logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ignored {
    pub reason: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Ignored {
    pub fn because<D: fmt::Display>(reason: D) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Ignored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ignored: {}", self.reason)
    }
}
