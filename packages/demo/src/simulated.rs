//! In-memory queue that advances a batch a few jobs per fetch.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use actors::{SnapshotFuture, SnapshotSource};
use progress_core::{QueueProgress, QueueSnapshot, SessionCredential, SnapshotError};

struct SimState {
    progress: QueueProgress,
    /// Jobs finished per fetch.
    step: u64,
    /// Every n-th finished job fails.
    fail_every: Option<u64>,
    /// Fetch number that simulates a server outage.
    outage_on: Option<u64>,
    fetches: u64,
    /// Set once the done snapshot has been served; the session then ends.
    finished: bool,
}

/// A fake backend standing in for the transport and the job workers.
pub struct SimulatedQueue {
    state: Mutex<SimState>,
    latency: Duration,
}

impl SimulatedQueue {
    /// A batch of `total` jobs finishing `step` jobs per fetch.
    pub fn new(total: u64, step: u64) -> Self {
        Self {
            state: Mutex::new(SimState {
                progress: QueueProgress::new(total, 0, 0),
                step: step.max(1),
                fail_every: None,
                outage_on: None,
                fetches: 0,
                finished: false,
            }),
            latency: Duration::from_millis(150),
        }
    }

    /// Fail every `n`-th job.
    pub fn with_failure_every(self, n: u64) -> Self {
        self.edit(|s| s.fail_every = Some(n.max(1)));
        self
    }

    /// Fail the `n`-th fetch with a transport error.
    pub fn with_outage_on(self, n: u64) -> Self {
        self.edit(|s| s.outage_on = Some(n));
        self
    }

    fn edit(&self, f: impl FnOnce(&mut SimState)) {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner));
    }

    /// Advance the batch and render the response body the server would send.
    fn next_response(&self) -> Result<String, SnapshotError> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = &mut *guard;
        state.fetches += 1;
        if state.outage_on == Some(state.fetches) {
            return Err(SnapshotError::Transport("503 Service Unavailable".into()));
        }

        let snapshot = if state.finished {
            QueueSnapshot::inactive()
        } else {
            for _ in 0..state.step {
                if state.progress.remaining() == 0 {
                    break;
                }
                let job_number = state.progress.processed() + 1;
                let fail_every = state.fail_every;
                match fail_every {
                    Some(n) if job_number % n == 0 => state.progress.failed_jobs += 1,
                    _ => state.progress.completed_jobs += 1,
                }
            }
            state.finished = state.progress.is_done();
            QueueSnapshot::active(state.progress)
        };

        serde_json::to_string(&snapshot)
            .map_err(|e| SnapshotError::Transport(format!("failed to encode snapshot: {}", e)))
    }
}

impl SnapshotSource for SimulatedQueue {
    fn fetch(&self, credential: &SessionCredential) -> SnapshotFuture {
        tracing::debug!("Serving snapshot for {:?}", credential);
        let response = self.next_response();
        let latency = self.latency;
        Box::pin(async move {
            tokio::time::sleep(latency).await;
            QueueSnapshot::from_json(&response?)
        })
    }
}
