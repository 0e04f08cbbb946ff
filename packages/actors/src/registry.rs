//! Registry of trackers keyed by client session.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::handle::TrackerHandle;

/// Maps a client-session key to that session's tracker.
///
/// One tracker per authenticated session. Owned by whoever manages sessions
/// and passed where needed.
#[derive(Default)]
pub struct TrackerRegistry {
    trackers: RwLock<HashMap<String, TrackerHandle>>,
}

impl TrackerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tracker, returning the one it replaced.
    pub fn register(&self, session_key: &str, tracker: TrackerHandle) -> Option<TrackerHandle> {
        self.trackers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_key.to_string(), tracker)
    }

    /// Get the tracker for a session.
    pub fn get(&self, session_key: &str) -> Option<TrackerHandle> {
        self.trackers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_key)
            .cloned()
    }

    /// Unregister a session's tracker and return it.
    pub fn remove(&self, session_key: &str) -> Option<TrackerHandle> {
        self.trackers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_key)
    }

    /// List all registered session keys.
    pub fn session_keys(&self) -> Vec<String> {
        self.trackers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.trackers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unregister every tracker and shut each one down.
    pub fn shutdown_all(&self) {
        let drained: Vec<(String, TrackerHandle)> = self
            .trackers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (session_key, tracker) in drained {
            if let Err(e) = tracker.shutdown() {
                tracing::warn!("Failed to shut down tracker for {}: {}", session_key, e);
            }
        }
    }
}
