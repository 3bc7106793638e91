//! # State Reconciler
//!
//! Owns what the panel displays for the rover's power and mode, merging server snapshots with the
//! operator's own mode changes.
//!
//! When the operator selects a mode the display switches straight away and a [`ModeOverride`] is
//! created. Until the override is confirmed by a snapshot reporting that mode, or expires, snapshots
//! reporting any other mode do not touch the displayed mode. Without this the next poll, which was
//! likely produced before the server saw the command, would flick the display back.
//!
//! Power has no override: it always follows the server. Synchronising the power switch raises a
//! guard so the switch's own change notification isn't mistaken for the operator.
//!
//! The reconciliation itself is the pure function [`reconcile`], [`Reconciler`] holds its state
//! between snapshots.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

use comms_if::tc::Mode;

use crate::telemetry::{SensorReadings, TelemetrySnapshot};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An unconfirmed, locally initiated mode change.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeOverride {
    pub mode: Mode,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// What the panel shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayState {
    /// Latest confirmed power state, `None` until the first snapshot.
    pub power: Option<bool>,

    /// Displayed mode, which may be an optimistic one.
    pub mode: Option<String>,

    /// Time the server last heard from the rover, as reported by the server.
    pub last_seen: Option<String>,

    /// Last known sensor readings.
    pub readings: SensorReadings,
}

/// Output of [`reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub display: DisplayState,
    pub mode_override: Option<ModeOverride>,
    pub outcome: OverrideOutcome,

    /// The power widgets were changed by this snapshot.
    pub power_synced: bool,
}

/// State reconciler.
#[derive(Debug)]
pub struct Reconciler {
    override_ttl: Duration,
    current_override: Option<ModeOverride>,
    display: DisplayState,
    toggle_guard: bool,

    /// Number of overrides confirmed by the server.
    pub num_confirmed: u64,

    /// Number of overrides abandoned after expiring.
    pub num_expired: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// What happened to the mode override during a reconciliation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OverrideOutcome {
    /// There was no override.
    None,

    /// The override is live and the snapshot disagrees, the displayed mode was kept.
    Held,

    /// The snapshot reported the override's mode.
    Confirmed,

    /// The override had expired and was dropped.
    Expired,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ModeOverride {
    pub fn new(mode: Mode, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            mode,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// An override is live up to and including its expiry time.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

impl Reconciler {
    pub fn new(override_ttl: Duration) -> Self {
        Self {
            override_ttl,
            current_override: None,
            display: DisplayState::default(),
            toggle_guard: false,
            num_confirmed: 0,
            num_expired: 0,
        }
    }

    /// Display an operator-selected mode immediately, holding it until the server confirms it or
    /// the override expires. Replaces any existing override.
    pub fn seed_override(&mut self, mode: Mode, now: DateTime<Utc>) -> &ModeOverride {
        debug!("Mode override to {} until {}", mode, now + self.override_ttl);

        self.display.mode = Some(mode.as_str().to_string());

        self.current_override
            .insert(ModeOverride::new(mode, now, self.override_ttl))
    }

    /// Merge a server snapshot into the display.
    pub fn apply_snapshot(
        &mut self,
        snapshot: &TelemetrySnapshot,
        now: DateTime<Utc>,
    ) -> &DisplayState {
        let r = reconcile(
            &self.display,
            self.current_override.as_ref(),
            snapshot,
            now,
        );

        match r.outcome {
            OverrideOutcome::Confirmed => {
                self.num_confirmed += 1;
                debug!("Mode override confirmed by server");
            }
            OverrideOutcome::Expired => {
                self.num_expired += 1;
                info!(
                    "Mode change was not confirmed in time, showing server mode {:?}",
                    r.display.mode
                );
            }
            _ => (),
        }

        if r.power_synced {
            self.toggle_guard = true;
        }

        self.display = r.display;
        self.current_override = r.mode_override;

        &self.display
    }

    /// Whether the power switch is being synchronised.
    pub fn toggle_guard(&self) -> bool {
        self.toggle_guard
    }

    pub fn clear_toggle_guard(&mut self) {
        self.toggle_guard = false;
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn current_override(&self) -> Option<&ModeOverride> {
        self.current_override.as_ref()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compute the next display state from the current one, the live override and a snapshot.
///
/// Applying the same snapshot twice gives the same result as applying it once.
pub fn reconcile(
    display: &DisplayState,
    current: Option<&ModeOverride>,
    snapshot: &TelemetrySnapshot,
    now: DateTime<Utc>,
) -> Reconciliation {
    let mut next = display.clone();

    // Power is always the server's
    next.power = Some(snapshot.power);
    let power_synced = display.power != next.power;

    // Mode
    let (mode_override, outcome) = match current {
        Some(o) if o.is_live(now) => {
            if snapshot.mode.as_deref() == Some(o.mode.as_str()) {
                next.mode = snapshot.mode.clone();
                (None, OverrideOutcome::Confirmed)
            } else {
                (Some(o.clone()), OverrideOutcome::Held)
            }
        }
        other => {
            if snapshot.mode.is_some() {
                next.mode = snapshot.mode.clone();
            }
            let outcome = match other {
                Some(_) => OverrideOutcome::Expired,
                None => OverrideOutcome::None,
            };
            (None, outcome)
        }
    };

    if snapshot.last_seen.is_some() {
        next.last_seen = snapshot.last_seen.clone();
    }

    // A powered down rover's sensors aren't read, keep what we last had
    if snapshot.power {
        next.readings.merge(&snapshot.readings);
    }

    Reconciliation {
        display: next,
        mode_override,
        outcome,
        power_synced,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
