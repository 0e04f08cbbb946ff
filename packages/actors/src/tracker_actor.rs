//! Tracker actor that polls a snapshot source and drives the progress state machine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use progress_core::{
    ClearDelays, CooldownLatch, Intent, SnapshotError, TrackerConfig, TrackerId, TrackerInput,
    TrackerMetrics, TrackerPhase, TrackerState, reduce,
};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::messages::{FetchToken, RefreshOutcome, TrackerMessage};
use crate::source::{CredentialProvider, SnapshotResult, SnapshotSource};
use crate::status::ObservableStatus;

/// Tracker actor arguments.
pub struct TrackerArgs {
    pub id: TrackerId,
    pub config: TrackerConfig,
    pub source: Arc<dyn SnapshotSource>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub status: ObservableStatus,
    pub metrics: Arc<TrackerMetrics>,
}

/// State for the tracker actor.
pub struct TrackerActorState {
    id: TrackerId,
    config: TrackerConfig,
    delays: ClearDelays,
    /// The only copy of the tracker state; mutated in `handle` alone.
    tracker: TrackerState,
    source: Arc<dyn SnapshotSource>,
    credentials: Arc<dyn CredentialProvider>,
    status: ObservableStatus,
    metrics: Arc<TrackerMetrics>,
    epoch: u64,
    next_seq: u64,
    in_flight: Option<FetchToken>,
    /// Set by `Start`, cleared by `Stop`. Keeps the timer running while idle.
    tracking_requested: bool,
    poll_timer: Option<JoinHandle<()>>,
    clear_timer: Option<JoinHandle<()>>,
    refresh_latch: CooldownLatch,
}

impl TrackerActorState {
    /// Create a new tracker actor state.
    pub fn new(args: TrackerArgs) -> Self {
        Self {
            id: args.id,
            delays: args.config.clear_delays(),
            refresh_latch: CooldownLatch::new(args.config.refresh_cooldown()),
            config: args.config,
            tracker: TrackerState::idle(),
            source: args.source,
            credentials: args.credentials,
            status: args.status,
            metrics: args.metrics,
            epoch: 0,
            next_seq: 0,
            in_flight: None,
            tracking_requested: false,
            poll_timer: None,
            clear_timer: None,
        }
    }

    /// Invalidate every fetch, tick and timer issued so far.
    fn bump_epoch(&mut self) {
        self.epoch += 1;
        self.in_flight = None;
    }

    /// Spawn a fetch and remember it as the one in flight.
    fn issue_fetch(&mut self, myself: &ActorRef<TrackerMessage>) {
        self.next_seq += 1;
        let token = FetchToken {
            epoch: self.epoch,
            seq: self.next_seq,
        };
        self.in_flight = Some(token);
        self.metrics.record_fetch();
        tracing::debug!(tracker = %self.id, epoch = token.epoch, seq = token.seq, "Fetching snapshot");

        let source = self.source.clone();
        let credentials = self.credentials.clone();
        let timeout = self.config.fetch_timeout();
        let myself = myself.clone();
        tokio::spawn(async move {
            let result = fetch_snapshot(source.as_ref(), credentials.as_ref(), timeout).await;
            // The actor may have shut down meanwhile; nothing left to tell.
            let _ = myself.send_message(TrackerMessage::FetchCompleted { token, result });
        });
    }

    fn start_poll_timer(&mut self, myself: &ActorRef<TrackerMessage>) {
        self.stop_poll_timer();
        let period = self.config.tick_interval();
        let epoch = self.epoch;
        let myself = myself.clone();
        self.poll_timer = Some(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if myself.send_message(TrackerMessage::Tick { epoch }).is_err() {
                    break;
                }
            }
        }));
    }

    fn ensure_poll_timer(&mut self, myself: &ActorRef<TrackerMessage>) {
        if self.poll_timer.is_none() {
            self.start_poll_timer(myself);
        }
    }

    fn stop_poll_timer(&mut self) {
        if let Some(timer) = self.poll_timer.take() {
            timer.abort();
        }
    }

    fn schedule_clear(&mut self, myself: &ActorRef<TrackerMessage>, deadline: Instant) {
        self.cancel_clear();
        let myself = myself.clone();
        self.clear_timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            let _ = myself.send_message(TrackerMessage::ClearDeadline { deadline });
        }));
    }

    fn cancel_clear(&mut self) {
        if let Some(timer) = self.clear_timer.take() {
            timer.abort();
        }
    }

    /// Run one reduction and apply its intents.
    fn apply(&mut self, myself: &ActorRef<TrackerMessage>, input: TrackerInput, now: Instant) {
        let transition = reduce(&self.tracker, input, now, &self.delays);
        if transition.is_noop() {
            return;
        }

        let from = self.tracker.phase;
        self.tracker = transition.state;
        if from != self.tracker.phase {
            tracing::info!(
                tracker = %self.id,
                from = %from,
                to = %self.tracker.phase,
                "Tracker phase changed"
            );
        }

        let mut draft = self.status.current();
        for intent in transition.intents {
            match intent {
                Intent::PublishProgress(progress) => {
                    tracing::debug!(tracker = %self.id, %progress, "Progress");
                    draft.progress = Some(progress);
                }
                Intent::ClearProgress => draft.progress = None,
                Intent::PublishError(error) => {
                    tracing::warn!(tracker = %self.id, %error, "Tracker error");
                    draft.error = Some(error);
                }
                Intent::ClearError => draft.error = None,
                Intent::ScheduleClear { deadline, delay } => {
                    tracing::debug!(tracker = %self.id, ?delay, "Scheduling progress clear");
                    self.schedule_clear(myself, deadline);
                }
                Intent::CancelClear => self.cancel_clear(),
                Intent::StartPolling => self.ensure_poll_timer(myself),
                Intent::StopPolling => {
                    if !self.tracking_requested {
                        self.stop_poll_timer();
                    }
                }
            }
        }
        draft.active = self.tracker.phase.is_active();
        draft.updated_at = chrono::Utc::now();
        self.status.publish(draft);
    }

    fn reset(&mut self) {
        self.stop_poll_timer();
        self.cancel_clear();
        self.tracker = TrackerState::idle();
        self.refresh_latch.reset();
        self.status.publish(self.tracker.status());
    }
}

/// Obtain a credential and fetch one snapshot, bounded by `timeout`.
async fn fetch_snapshot(
    source: &dyn SnapshotSource,
    credentials: &dyn CredentialProvider,
    timeout: Option<Duration>,
) -> SnapshotResult {
    let Some(credential) = credentials.credential() else {
        return Err(SnapshotError::MissingCredential);
    };
    let fetch = source.fetch(&credential);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fetch)
            .await
            .unwrap_or(Err(SnapshotError::Timeout(limit))),
        None => fetch.await,
    }
}

/// Tracker actor. Its mailbox serializes commands, ticks and fetch results.
pub struct TrackerActor;

impl Actor for TrackerActor {
    type Msg = TrackerMessage;
    type State = TrackerActorState;
    type Arguments = TrackerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        args.config.validate()?;
        tracing::info!(
            tracker = %args.id,
            tick_ms = args.config.tick_interval_ms,
            "Starting progress tracker"
        );
        Ok(TrackerActorState::new(args))
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.stop_poll_timer();
        state.cancel_clear();
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            TrackerMessage::Start { reply } => {
                tracing::info!(tracker = %state.id, "Progress tracking started");
                state.bump_epoch();
                state.tracking_requested = true;
                state.tracker.last_error = None;
                state.status.update(|status| status.error = None);
                state.start_poll_timer(&myself);
                state.issue_fetch(&myself);
                let _ = reply.send(());
            }

            TrackerMessage::Stop { reply } => {
                tracing::info!(tracker = %state.id, "Progress tracking stopped");
                state.bump_epoch();
                state.tracking_requested = false;
                state.reset();
                let _ = reply.send(());
            }

            TrackerMessage::Refresh { reply } => {
                let outcome = if state.in_flight.is_some() {
                    state.metrics.record_refresh_coalesced();
                    RefreshOutcome::Coalesced
                } else if !state.refresh_latch.try_fire(Instant::now()) {
                    state.metrics.record_refresh_coalesced();
                    RefreshOutcome::CoolingDown
                } else {
                    state.issue_fetch(&myself);
                    RefreshOutcome::Issued
                };
                tracing::debug!(tracker = %state.id, ?outcome, "Refresh requested");
                let _ = reply.send(outcome);
            }

            TrackerMessage::Tick { epoch } => {
                if epoch != state.epoch {
                    return Ok(());
                }
                state.metrics.record_tick();
                if state.in_flight.is_some() {
                    state.metrics.record_tick_skipped();
                    tracing::debug!(tracker = %state.id, "Fetch still in flight, skipping tick");
                    return Ok(());
                }
                state.issue_fetch(&myself);
            }

            TrackerMessage::FetchCompleted { token, result } => {
                if state.in_flight != Some(token) {
                    state.metrics.record_stale();
                    tracing::debug!(
                        tracker = %state.id,
                        epoch = token.epoch,
                        current_epoch = state.epoch,
                        "Discarding stale snapshot result"
                    );
                    return Ok(());
                }
                state.in_flight = None;

                let input = match result {
                    Ok(snapshot) => TrackerInput::Snapshot(snapshot),
                    Err(err) => {
                        state.metrics.record_failure();
                        if err.is_auth() {
                            tracing::debug!(tracker = %state.id, "No valid session: {}", err);
                        }
                        TrackerInput::FetchFailed(err)
                    }
                };
                state.apply(&myself, input, Instant::now());
            }

            TrackerMessage::ClearDeadline { deadline } => {
                if state.tracker.pending_clear_deadline != Some(deadline) {
                    return Ok(());
                }
                state.clear_timer = None;
                // The timer only fires once the deadline has passed.
                let now = Instant::now().max(deadline);
                state.apply(&myself, TrackerInput::ClearDeadlineElapsed, now);
                if state.tracker.phase == TrackerPhase::Idle {
                    state.metrics.record_clear();
                }
            }

            TrackerMessage::GetState { reply } => {
                let _ = reply.send(state.tracker.clone());
            }

            TrackerMessage::Shutdown => {
                tracing::info!(tracker = %state.id, "Shutting down progress tracker");
                myself.stop(None);
                return Ok(());
            }
        }

        Ok(())
    }
}
