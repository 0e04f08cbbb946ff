//! Public handle for a running tracker.

use std::sync::Arc;

use progress_core::{
    MetricsSnapshot, TrackerConfig, TrackerId, TrackerMetrics, TrackerState, TrackerStatus,
};
use ractor::{Actor, ActorRef, RpcReplyPort};

use crate::messages::{RefreshOutcome, TrackerError, TrackerMessage};
use crate::source::{CredentialProvider, SnapshotSource};
use crate::status::{ObservableStatus, StatusSubscription};
use crate::tracker_actor::{TrackerActor, TrackerArgs};

/// Everything needed to spawn a tracker.
pub struct TrackerOptions {
    config: TrackerConfig,
    source: Arc<dyn SnapshotSource>,
    credentials: Arc<dyn CredentialProvider>,
    metrics: Arc<TrackerMetrics>,
}

impl TrackerOptions {
    /// A tracker over `source`, authenticated by `credentials`, with default config.
    pub fn new(source: impl SnapshotSource, credentials: impl CredentialProvider) -> Self {
        Self {
            config: TrackerConfig::default(),
            source: Arc::new(source),
            credentials: Arc::new(credentials),
            metrics: Arc::new(TrackerMetrics::new()),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Report into a caller-owned metrics collector.
    pub fn with_metrics(mut self, metrics: Arc<TrackerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Cheap, cloneable handle to one tracker.
#[derive(Clone)]
pub struct TrackerHandle {
    id: TrackerId,
    actor: ActorRef<TrackerMessage>,
    status: ObservableStatus,
    metrics: Arc<TrackerMetrics>,
}

impl TrackerHandle {
    pub fn id(&self) -> TrackerId {
        self.id
    }

    /// Latest published status. Never triggers a fetch.
    pub fn status(&self) -> TrackerStatus {
        self.status.current()
    }

    /// Observe status changes.
    pub fn subscribe(&self) -> StatusSubscription {
        self.status.subscribe()
    }

    /// The status holder shared with the tracker.
    pub fn observable(&self) -> &ObservableStatus {
        &self.status
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Begin tracking. Returns once the first fetch has been issued.
    pub async fn start(&self) -> Result<(), TrackerError> {
        self.call(|reply| TrackerMessage::Start { reply }).await
    }

    /// Stop tracking. Returns once the idle status has been published.
    pub async fn stop(&self) -> Result<(), TrackerError> {
        self.call(|reply| TrackerMessage::Stop { reply }).await
    }

    /// Fetch once outside the timer schedule.
    pub async fn refresh(&self) -> Result<RefreshOutcome, TrackerError> {
        self.call(|reply| TrackerMessage::Refresh { reply }).await
    }

    /// Copy of the tracker's internal state.
    pub async fn state(&self) -> Result<TrackerState, TrackerError> {
        self.call(|reply| TrackerMessage::GetState { reply }).await
    }

    /// Stop the tracker actor.
    pub fn shutdown(&self) -> Result<(), TrackerError> {
        self.actor
            .send_message(TrackerMessage::Shutdown)
            .map_err(|e| TrackerError::Messaging(e.to_string()))
    }

    async fn call<T>(
        &self,
        message: impl FnOnce(RpcReplyPort<T>) -> TrackerMessage,
    ) -> Result<T, TrackerError>
    where
        T: Send + 'static,
    {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.actor
            .send_message(message(tx.into()))
            .map_err(|e| TrackerError::Messaging(e.to_string()))?;
        rx.await.map_err(|_| TrackerError::ReplyDropped)
    }
}

/// Spawn a tracker actor. It stays idle until started or refreshed.
pub async fn spawn_tracker(
    options: TrackerOptions,
) -> Result<(TrackerHandle, tokio::task::JoinHandle<()>), TrackerError> {
    options.config.validate()?;

    let id = TrackerId::new();
    let status = ObservableStatus::new();
    let args = TrackerArgs {
        id,
        config: options.config,
        source: options.source,
        credentials: options.credentials,
        status: status.clone(),
        metrics: options.metrics.clone(),
    };

    let (actor, join) = Actor::spawn(Some(format!("tracker-{}", id)), TrackerActor, args)
        .await
        .map_err(|e| TrackerError::Spawn(e.to_string()))?;

    Ok((
        TrackerHandle {
            id,
            actor,
            status,
            metrics: options.metrics,
        },
        join,
    ))
}
