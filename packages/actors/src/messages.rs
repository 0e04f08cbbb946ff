//! Message types for tracker actor communication.

use std::time::Instant;

use progress_core::{ConfigError, QueueSnapshot, SnapshotError, TrackerState};
use ractor::RpcReplyPort;

/// Identifies one snapshot fetch.
///
/// `epoch` changes on every start/stop; a result whose epoch no longer
/// matches the tracker's is stale and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchToken {
    pub epoch: u64,
    pub seq: u64,
}

/// What happened to a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new fetch was started.
    Issued,
    /// A fetch was already in flight; its result will serve.
    Coalesced,
    /// A refresh ran too recently.
    CoolingDown,
}

/// Messages for the TrackerActor.
#[derive(Debug)]
pub enum TrackerMessage {
    /// Begin tracking: clear errors, fetch now, enable the timer.
    Start { reply: RpcReplyPort<()> },

    /// Stop tracking and reset to idle.
    Stop { reply: RpcReplyPort<()> },

    /// Fetch once without touching the timer.
    Refresh {
        reply: RpcReplyPort<RefreshOutcome>,
    },

    /// Timer tick for the given epoch.
    Tick { epoch: u64 },

    /// A spawned fetch finished.
    FetchCompleted {
        token: FetchToken,
        result: Result<QueueSnapshot, SnapshotError>,
    },

    /// The clear deadline scheduled for `deadline` fired.
    ClearDeadline { deadline: Instant },

    /// Read the current tracker state.
    GetState { reply: RpcReplyPort<TrackerState> },

    /// Stop the actor.
    Shutdown,
}

/// Error type for tracker handle operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to spawn tracker: {0}")]
    Spawn(String),

    #[error("Tracker unreachable: {0}")]
    Messaging(String),

    #[error("Tracker dropped the reply")]
    ReplyDropped,
}
