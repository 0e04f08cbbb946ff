#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use actors::{SnapshotFuture, SnapshotResult, SnapshotSource, StatusSubscription};
use progress_core::{
    QueueProgress, QueueSnapshot, SessionCredential, SnapshotError, TrackerConfig, TrackerStatus,
};
use tokio::sync::Semaphore;

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(3);

/// Snapshot source that replays a script, then repeats a fallback.
///
/// When gated, every fetch blocks until the test releases a permit.
pub struct ScriptedSource {
    script: Mutex<VecDeque<SnapshotResult>>,
    fallback: SnapshotResult,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<SnapshotResult>, fallback: SnapshotResult) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Hold every fetch until [`ScriptedSource::release`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` blocked fetches complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for ScriptedSource {
    fn fetch(&self, _credential: &SessionCredential) -> SnapshotFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        let gate = self.gate.clone();
        Box::pin(async move {
            if let Some(gate) = gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            response
        })
    }
}

pub fn active(total: u64, completed: u64, failed: u64) -> SnapshotResult {
    Ok(QueueSnapshot::active(QueueProgress::new(total, completed, failed)))
}

pub fn inactive() -> SnapshotResult {
    Ok(QueueSnapshot::inactive())
}

pub fn transport_error(msg: &str) -> SnapshotResult {
    Err(SnapshotError::Transport(msg.to_string()))
}

pub fn credential() -> SessionCredential {
    SessionCredential::new("test-session")
}

/// Short intervals so tests run in well under a second each.
pub fn fast_config() -> TrackerConfig {
    TrackerConfig::default()
        .with_tick_interval(Duration::from_millis(100))
        .with_clear_delays(Duration::from_millis(400), Duration::from_millis(250))
        .with_refresh_cooldown(Duration::ZERO)
}

/// Wait until the status satisfies `pred`.
pub async fn wait_status(
    subscription: &mut StatusSubscription,
    pred: impl FnMut(&TrackerStatus) -> bool,
) -> Option<TrackerStatus> {
    tokio::time::timeout(WAIT, subscription.wait_for(pred))
        .await
        .ok()
        .flatten()
}

/// Poll `check` until it holds or [`WAIT`] elapses.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
