//! Snapshot and progress value types exchanged with the snapshot source.

use serde::{Deserialize, Serialize};

use crate::SnapshotError;

/// Job counts for one batch at a single point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueProgress {
    /// Number of jobs in the batch.
    pub total_jobs: u64,
    /// Number of jobs that finished successfully.
    pub completed_jobs: u64,
    /// Number of jobs that finished with an error.
    pub failed_jobs: u64,
}

impl QueueProgress {
    /// Create a progress value.
    pub fn new(total_jobs: u64, completed_jobs: u64, failed_jobs: u64) -> Self {
        Self {
            total_jobs,
            completed_jobs,
            failed_jobs,
        }
    }

    /// Jobs that reached a terminal state, successful or not.
    pub fn processed(&self) -> u64 {
        self.completed_jobs.saturating_add(self.failed_jobs)
    }

    /// Jobs still outstanding.
    pub fn remaining(&self) -> u64 {
        self.total_jobs.saturating_sub(self.processed())
    }

    /// A batch is done once every job has either completed or failed.
    ///
    /// Overshoot (more processed than total) also counts as done, and an empty
    /// batch is done immediately.
    pub fn is_done(&self) -> bool {
        self.processed() >= self.total_jobs
    }

    /// Completion as a percentage, `None` for an empty batch.
    pub fn percent(&self) -> Option<f64> {
        if self.total_jobs == 0 {
            None
        } else {
            let processed = self.processed().min(self.total_jobs);
            Some((processed as f64 / self.total_jobs as f64) * 100.0)
        }
    }

    /// Check the `completed + failed <= total` invariant.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.processed() > self.total_jobs {
            return Err(SnapshotError::DataIntegrity(format!(
                "completed ({}) + failed ({}) exceeds total ({})",
                self.completed_jobs, self.failed_jobs, self.total_jobs
            )));
        }
        Ok(())
    }

    /// Raise `total_jobs` so the invariant holds. The result is always done
    /// when the input was in violation.
    pub fn clamped(&self) -> Self {
        Self {
            total_jobs: self.total_jobs.max(self.processed()),
            ..*self
        }
    }
}

impl std::fmt::Display for QueueProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.completed_jobs, self.total_jobs)?;
        if self.failed_jobs > 0 {
            write!(f, " ({} failed)", self.failed_jobs)?;
        }
        Ok(())
    }
}

/// One point-in-time read of the queue session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    /// Whether the client currently has a batch being processed.
    pub has_active_session: bool,
    /// Progress of that batch; present iff `has_active_session`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<QueueProgress>,
}

impl QueueSnapshot {
    /// Snapshot for a client with no batch in progress.
    pub fn inactive() -> Self {
        Self {
            has_active_session: false,
            progress: None,
        }
    }

    /// Snapshot for a client with a batch in progress.
    pub fn active(progress: QueueProgress) -> Self {
        Self {
            has_active_session: true,
            progress: Some(progress),
        }
    }

    /// Decode a snapshot from its JSON wire form.
    ///
    /// Malformed payloads are transport failures: the collaborator returned
    /// something the tracker cannot interpret.
    pub fn from_json(body: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(body)
            .map_err(|e| SnapshotError::Transport(format!("malformed snapshot payload: {}", e)))
    }

    /// The progress of the active session.
    ///
    /// Returns `Ok(None)` when there is no session, and a transport error when a
    /// session is reported without any progress.
    pub fn session_progress(&self) -> Result<Option<QueueProgress>, SnapshotError> {
        match (self.has_active_session, self.progress) {
            (false, _) => Ok(None),
            (true, Some(progress)) => Ok(Some(progress)),
            (true, None) => Err(SnapshotError::Transport(
                "malformed snapshot payload: active session without progress".into(),
            )),
        }
    }
}
