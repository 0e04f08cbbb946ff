//! Observable tracker status.

use std::sync::Arc;

use progress_core::{TrackerState, TrackerStatus};
use tokio::sync::watch;

/// Current-value holder for a tracker's status.
///
/// Reads never trigger a poll. Publishing an equal value does not wake
/// subscribers, and slow subscribers only ever see the latest value.
#[derive(Debug, Clone)]
pub struct ObservableStatus {
    tx: Arc<watch::Sender<TrackerStatus>>,
}

impl ObservableStatus {
    /// A holder starting from the idle status.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(TrackerState::idle().status());
        Self { tx: Arc::new(tx) }
    }

    /// The latest published status.
    pub fn current(&self) -> TrackerStatus {
        self.tx.borrow().clone()
    }

    /// Replace the status. Returns whether observers were notified.
    pub fn publish(&self, status: TrackerStatus) -> bool {
        self.tx.send_if_modified(|current| {
            if current.same_as(&status) {
                false
            } else {
                *current = status;
                true
            }
        })
    }

    /// Edit a copy of the current status and publish it.
    pub fn update(&self, edit: impl FnOnce(&mut TrackerStatus)) -> bool {
        let mut draft = self.current();
        edit(&mut draft);
        draft.updated_at = chrono::Utc::now();
        self.publish(draft)
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> StatusSubscription {
        StatusSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ObservableStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// One observer's subscription to a tracker's status.
///
/// Call [`StatusSubscription::unsubscribe`] (or drop it) when the observer
/// goes away; nothing else needs to be cleaned up.
#[derive(Debug)]
pub struct StatusSubscription {
    rx: watch::Receiver<TrackerStatus>,
}

impl StatusSubscription {
    /// The latest status, marking it as seen.
    pub fn current(&mut self) -> TrackerStatus {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next change. Returns `None` once the tracker is gone.
    pub async fn changed(&mut self) -> Option<TrackerStatus> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the status satisfies `pred`, checking the current value first.
    pub async fn wait_for(
        &mut self,
        mut pred: impl FnMut(&TrackerStatus) -> bool,
    ) -> Option<TrackerStatus> {
        self.rx.wait_for(|status| pred(status)).await.ok().map(|status| (*status).clone())
    }

    /// End this subscription.
    pub fn unsubscribe(self) {
        drop(self.rx);
    }
}
