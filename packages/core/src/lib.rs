//! Core domain types for the queue progress tracker.
//!
//! This crate contains the runtime-free parts shared by all packages:
//! - QueueSnapshot and QueueProgress, the contract with the snapshot source
//! - TrackerState and TrackerStatus, what the poller owns and what observers see
//! - The pure state machine driving those transitions
//! - Configuration, metrics and the refresh cooldown latch

mod config;
mod error;
mod latch;
mod machine;
mod metrics;
mod progress;
mod state;

pub use config::{DEFAULT_REFRESH_COOLDOWN, DEFAULT_TICK_INTERVAL, TrackerConfig};
pub use error::{ConfigError, ErrorKind, SnapshotError};
pub use latch::CooldownLatch;
pub use machine::{
    COMPLETED_CLEAR_DELAY, ClearDelays, Intent, TrackerInput, Transition, VANISHED_CLEAR_DELAY,
    reduce,
};
pub use metrics::{MetricsSnapshot, TrackerMetrics};
pub use progress::{QueueProgress, QueueSnapshot};
pub use state::{SessionCredential, TrackerId, TrackerPhase, TrackerState, TrackerStatus};
