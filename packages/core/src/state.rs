//! Tracker state, its observer-facing projection, and identifiers.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::QueueProgress;

/// Unique identifier for a tracker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackerId(pub Ulid);

impl TrackerId {
    /// Create a new unique tracker ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a tracker ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for TrackerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrackerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque credential identifying the client session to the snapshot source.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the transport layer.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCredential(<redacted>)")
    }
}

/// Lifecycle phase of a tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerPhase {
    /// No batch known.
    #[default]
    Idle,
    /// A batch is in progress.
    Active,
    /// The batch finished or vanished; progress is shown until the clear deadline.
    Completing,
    /// The last fetch failed.
    Error,
}

impl TrackerPhase {
    /// Phases during which a batch is considered active by observers.
    pub fn is_active(&self) -> bool {
        matches!(self, TrackerPhase::Active | TrackerPhase::Completing)
    }
}

impl std::fmt::Display for TrackerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerPhase::Idle => write!(f, "idle"),
            TrackerPhase::Active => write!(f, "active"),
            TrackerPhase::Completing => write!(f, "completing"),
            TrackerPhase::Error => write!(f, "error"),
        }
    }
}

/// State owned by the poller. Only the poller's message handler mutates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    pub phase: TrackerPhase,
    pub last_progress: Option<QueueProgress>,
    pub last_error: Option<String>,
    /// Monotonic instant at which a `Completing` tracker returns to `Idle`.
    pub pending_clear_deadline: Option<Instant>,
}

impl TrackerState {
    /// A fresh idle state.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Project this state onto what observers see.
    pub fn status(&self) -> TrackerStatus {
        TrackerStatus {
            progress: self.last_progress,
            active: self.phase.is_active(),
            error: self.last_error.clone(),
            updated_at: Utc::now(),
        }
    }
}

/// The value observers read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerStatus {
    /// Last known progress, absent when nothing is being tracked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<QueueProgress>,
    /// Whether a batch is currently active or completing.
    pub active: bool,
    /// Error to surface, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When this value was produced.
    pub updated_at: DateTime<Utc>,
}

impl TrackerStatus {
    /// Compare the observable fields, ignoring `updated_at`.
    pub fn same_as(&self, other: &TrackerStatus) -> bool {
        self.progress == other.progress && self.active == other.active && self.error == other.error
    }
}
