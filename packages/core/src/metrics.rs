//! Poll counters shared between a tracker and whoever inspects it.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Collector of poll counters.
///
/// Created by the caller and handed to each tracker, typically behind an
/// `Arc`, so tests and dashboards can read and reset it.
#[derive(Debug, Default)]
pub struct TrackerMetrics {
    ticks: AtomicU64,
    ticks_skipped: AtomicU64,
    fetches_issued: AtomicU64,
    fetch_failures: AtomicU64,
    stale_results: AtomicU64,
    clears_fired: AtomicU64,
    refreshes_coalesced: AtomicU64,
}

/// Point-in-time copy of [`TrackerMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Timer ticks received.
    pub ticks: u64,
    /// Ticks dropped because a fetch was still in flight.
    pub ticks_skipped: u64,
    /// Snapshot fetches started.
    pub fetches_issued: u64,
    /// Fetches that ended in an error, auth included.
    pub fetch_failures: u64,
    /// Results discarded because the tracker was stopped or restarted.
    pub stale_results: u64,
    /// Clear deadlines that returned the tracker to idle.
    pub clears_fired: u64,
    /// Refresh requests absorbed by the cooldown or an in-flight fetch.
    pub refreshes_coalesced: u64,
}

impl TrackerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick_skipped(&self) {
        self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch(&self) {
        self.fetches_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale_results.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clear(&self) {
        self.clears_fired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_coalesced(&self) {
        self.refreshes_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            fetches_issued: self.fetches_issued.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            stale_results: self.stale_results.load(Ordering::Relaxed),
            clears_fired: self.clears_fired.load(Ordering::Relaxed),
            refreshes_coalesced: self.refreshes_coalesced.load(Ordering::Relaxed),
        }
    }

    /// Zero all counters.
    pub fn reset(&self) {
        for counter in [
            &self.ticks,
            &self.ticks_skipped,
            &self.fetches_issued,
            &self.fetch_failures,
            &self.stale_results,
            &self.clears_fired,
            &self.refreshes_coalesced,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
