//! Error types shared by the tracker crates.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to obtain a usable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("No session credential available")]
    MissingCredential,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Snapshot fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
}

/// Broad classification used by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credential invalid, expired or absent. Not a tracker fault.
    Auth,
    /// Network, server, payload or timeout failure.
    Transport,
    /// The snapshot contradicts its own invariants.
    DataIntegrity,
}

impl SnapshotError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SnapshotError::Auth(_) | SnapshotError::MissingCredential => ErrorKind::Auth,
            SnapshotError::Transport(_) | SnapshotError::Timeout(_) => ErrorKind::Transport,
            SnapshotError::DataIntegrity(_) => ErrorKind::DataIntegrity,
        }
    }

    /// Whether the error means "not logged in" rather than a failed fetch.
    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }
}

/// Invalid tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Parse { key: String, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("Completed and vanished clear delays must differ (both {0}ms)")]
    IdenticalClearDelays(u64),
}
