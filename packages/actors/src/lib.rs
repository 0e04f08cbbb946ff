//! Actor system for the queue progress tracker.
//!
//! This crate provides the Ractor-based poller that turns periodic queue
//! snapshots into an observable progress status.
//!
//! # Architecture
//!
//! - `TrackerActor` - Owns the tracker state; its mailbox serializes commands,
//!   timer ticks and fetch results
//! - `SnapshotSource` / `CredentialProvider` - Seams to the transport and auth layers
//! - `ObservableStatus` - Current-value status shared with observers
//! - `TrackerRegistry` - One tracker per client session
//!
//! # Usage
//!
//! ```ignore
//! use actors::{SharedCredential, TrackerOptions, spawn_tracker};
//!
//! let (tracker, _join) = spawn_tracker(TrackerOptions::new(source, credentials)).await?;
//! let mut subscription = tracker.subscribe();
//! tracker.start().await?;
//! while let Some(status) = subscription.changed().await { ... }
//! ```

mod handle;
mod messages;
pub mod registry;
mod source;
mod status;
mod tracker_actor;

pub use handle::{TrackerHandle, TrackerOptions, spawn_tracker};
pub use messages::{FetchToken, RefreshOutcome, TrackerError, TrackerMessage};
pub use registry::TrackerRegistry;
pub use source::{
    CredentialProvider, FnSource, SharedCredential, SnapshotFuture, SnapshotResult,
    SnapshotSource,
};
pub use status::{ObservableStatus, StatusSubscription};
pub use tracker_actor::{TrackerActor, TrackerArgs};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
