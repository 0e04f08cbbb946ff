//! Pure progress state machine.
//!
//! [`reduce`] takes the current [`TrackerState`] and one [`TrackerInput`] and
//! returns the next state together with the side effects the poller must
//! apply. It never performs I/O and never reads the clock; `now` is supplied
//! by the caller.

use std::time::{Duration, Instant};

use crate::{QueueProgress, SnapshotError, TrackerPhase, TrackerState};

/// How long a batch that reported itself done stays visible.
pub const COMPLETED_CLEAR_DELAY: Duration = Duration::from_millis(3000);

/// How long the last progress stays visible after the session disappeared
/// without reporting completion.
pub const VANISHED_CLEAR_DELAY: Duration = Duration::from_millis(2000);

/// Delays before a `Completing` tracker returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearDelays {
    /// After an explicit done snapshot.
    pub completed: Duration,
    /// After the session vanished.
    pub vanished: Duration,
}

impl Default for ClearDelays {
    fn default() -> Self {
        Self {
            completed: COMPLETED_CLEAR_DELAY,
            vanished: VANISHED_CLEAR_DELAY,
        }
    }
}

/// Something that happened to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerInput {
    /// A fetch succeeded.
    Snapshot(crate::QueueSnapshot),
    /// A fetch failed, or no credential was available.
    FetchFailed(SnapshotError),
    /// The pending clear deadline fired.
    ClearDeadlineElapsed,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Show this progress to observers.
    PublishProgress(QueueProgress),
    /// Stop showing progress.
    ClearProgress,
    /// Show this error to observers.
    PublishError(String),
    /// Stop showing an error.
    ClearError,
    /// Arrange for [`TrackerInput::ClearDeadlineElapsed`] at `deadline`.
    ScheduleClear { deadline: Instant, delay: Duration },
    /// Drop any scheduled clear.
    CancelClear,
    /// Polling is needed from now on.
    StartPolling,
    /// Polling is no longer needed on behalf of a batch.
    StopPolling,
}

/// Result of one reduction step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: TrackerState,
    pub intents: Vec<Intent>,
}

impl Transition {
    fn unchanged(state: &TrackerState) -> Self {
        Self {
            state: state.clone(),
            intents: Vec::new(),
        }
    }

    /// Whether the transition changed nothing.
    pub fn is_noop(&self) -> bool {
        self.intents.is_empty()
    }

    /// Whether an intent matching `pred` was emitted.
    pub fn has_intent(&self, pred: impl Fn(&Intent) -> bool) -> bool {
        self.intents.iter().any(pred)
    }

    /// The clear deadline scheduled by this transition, if any.
    pub fn scheduled_clear(&self) -> Option<Instant> {
        self.intents.iter().find_map(|intent| match intent {
            Intent::ScheduleClear { deadline, .. } => Some(*deadline),
            _ => None,
        })
    }
}

/// Compute the next state for `input`.
pub fn reduce(
    state: &TrackerState,
    input: TrackerInput,
    now: Instant,
    delays: &ClearDelays,
) -> Transition {
    match input {
        TrackerInput::Snapshot(snapshot) => match snapshot.session_progress() {
            Ok(Some(progress)) => on_session(state, progress, now, delays),
            Ok(None) => on_no_session(state, now, delays),
            Err(err) => on_failure(state, err),
        },
        TrackerInput::FetchFailed(err) => on_failure(state, err),
        TrackerInput::ClearDeadlineElapsed => on_deadline(state, now),
    }
}

fn on_session(
    state: &TrackerState,
    reported: QueueProgress,
    now: Instant,
    delays: &ClearDelays,
) -> Transition {
    let mut next = state.clone();
    let mut intents = Vec::new();

    // An inconsistent snapshot is clamped to done so the batch still finishes.
    let progress = match reported.validate() {
        Ok(()) => {
            if state.last_error.is_some() {
                next.last_error = None;
                intents.push(Intent::ClearError);
            }
            reported
        }
        Err(err) => {
            let message = err.to_string();
            next.last_error = Some(message.clone());
            intents.push(Intent::PublishError(message));
            reported.clamped()
        }
    };
    let done = progress.is_done();

    if matches!(state.phase, TrackerPhase::Idle | TrackerPhase::Error) {
        intents.push(Intent::StartPolling);
    }

    match (state.phase, done) {
        (TrackerPhase::Completing, true) if state.last_progress == Some(progress) => {
            // Same finished batch seen again; the original deadline stands.
        }
        (TrackerPhase::Completing, true) => {
            // A different finished batch gets its own full display window.
            let deadline = now + delays.completed;
            next.pending_clear_deadline = Some(deadline);
            next.last_progress = Some(progress);
            intents.push(Intent::CancelClear);
            intents.push(Intent::PublishProgress(progress));
            intents.push(Intent::ScheduleClear {
                deadline,
                delay: delays.completed,
            });
        }
        (TrackerPhase::Completing, false) => {
            next.phase = TrackerPhase::Active;
            next.pending_clear_deadline = None;
            next.last_progress = Some(progress);
            intents.push(Intent::CancelClear);
            intents.push(Intent::PublishProgress(progress));
        }
        (_, true) => {
            let deadline = now + delays.completed;
            next.phase = TrackerPhase::Completing;
            next.pending_clear_deadline = Some(deadline);
            next.last_progress = Some(progress);
            intents.push(Intent::PublishProgress(progress));
            intents.push(Intent::ScheduleClear {
                deadline,
                delay: delays.completed,
            });
        }
        (_, false) => {
            next.phase = TrackerPhase::Active;
            next.last_progress = Some(progress);
            intents.push(Intent::PublishProgress(progress));
        }
    }

    Transition {
        state: next,
        intents,
    }
}

fn on_no_session(state: &TrackerState, now: Instant, delays: &ClearDelays) -> Transition {
    match state.phase {
        TrackerPhase::Idle | TrackerPhase::Completing => Transition::unchanged(state),
        TrackerPhase::Active => {
            let deadline = now + delays.vanished;
            let mut next = state.clone();
            let mut intents = Vec::new();
            if state.last_error.is_some() {
                next.last_error = None;
                intents.push(Intent::ClearError);
            }
            next.phase = TrackerPhase::Completing;
            next.pending_clear_deadline = Some(deadline);
            intents.push(Intent::ScheduleClear {
                deadline,
                delay: delays.vanished,
            });
            Transition {
                state: next,
                intents,
            }
        }
        TrackerPhase::Error => {
            let mut intents = vec![Intent::ClearError];
            if state.last_progress.is_some() {
                intents.push(Intent::ClearProgress);
            }
            intents.push(Intent::StopPolling);
            Transition {
                state: TrackerState::idle(),
                intents,
            }
        }
    }
}

fn on_failure(state: &TrackerState, err: SnapshotError) -> Transition {
    let mut intents = Vec::new();
    if state.pending_clear_deadline.is_some() {
        intents.push(Intent::CancelClear);
    }

    // Not being logged in is not a tracker fault: go quiet instead of erroring.
    if err.is_auth() {
        if state.last_progress.is_some() {
            intents.push(Intent::ClearProgress);
        }
        if state.last_error.is_some() {
            intents.push(Intent::ClearError);
        }
        if state.phase != TrackerPhase::Idle {
            intents.push(Intent::StopPolling);
        }
        return Transition {
            state: TrackerState::idle(),
            intents,
        };
    }

    let message = err.to_string();
    if state.phase == TrackerPhase::Idle {
        intents.push(Intent::StartPolling);
    }
    intents.push(Intent::PublishError(message.clone()));

    Transition {
        state: TrackerState {
            phase: TrackerPhase::Error,
            last_progress: state.last_progress,
            last_error: Some(message),
            pending_clear_deadline: None,
        },
        intents,
    }
}

fn on_deadline(state: &TrackerState, now: Instant) -> Transition {
    let due = state
        .pending_clear_deadline
        .is_some_and(|deadline| now >= deadline);
    if state.phase != TrackerPhase::Completing || !due {
        return Transition::unchanged(state);
    }

    let mut intents = vec![Intent::ClearProgress];
    if state.last_error.is_some() {
        intents.push(Intent::ClearError);
    }
    intents.push(Intent::StopPolling);
    Transition {
        state: TrackerState::idle(),
        intents,
    }
}
