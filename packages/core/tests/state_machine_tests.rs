use std::time::{Duration, Instant};

use progress_core::{
    ClearDelays, Intent, QueueProgress, QueueSnapshot, SnapshotError, TrackerInput, TrackerPhase,
    TrackerState, Transition, reduce,
};

fn step(state: &TrackerState, input: TrackerInput, now: Instant) -> Transition {
    reduce(state, input, now, &ClearDelays::default())
}

fn active(total: u64, completed: u64, failed: u64) -> TrackerInput {
    TrackerInput::Snapshot(QueueSnapshot::active(QueueProgress::new(
        total, completed, failed,
    )))
}

fn inactive() -> TrackerInput {
    TrackerInput::Snapshot(QueueSnapshot::inactive())
}

fn transport(msg: &str) -> TrackerInput {
    TrackerInput::FetchFailed(SnapshotError::Transport(msg.to_string()))
}

#[test]
fn test_batch_lifecycle_scenarios() {
    let t0 = Instant::now();

    // A: first active snapshot
    let a = step(&TrackerState::idle(), active(10, 3, 0), t0);
    assert_eq!(a.state.phase, TrackerPhase::Active);
    assert_eq!(a.state.last_progress, Some(QueueProgress::new(10, 3, 0)));
    assert!(a.has_intent(|i| *i == Intent::PublishProgress(QueueProgress::new(10, 3, 0))));
    assert!(a.has_intent(|i| *i == Intent::StartPolling));
    assert_eq!(a.state.status().progress.map(|p| p.to_string()).as_deref(), Some("3/10"));

    // B: all jobs processed, some failed
    let t1 = t0 + Duration::from_millis(2000);
    let b = step(&a.state, active(10, 7, 3), t1);
    assert_eq!(b.state.phase, TrackerPhase::Completing);
    assert_eq!(b.state.pending_clear_deadline, Some(t1 + Duration::from_millis(3000)));
    assert_eq!(b.scheduled_clear(), Some(t1 + Duration::from_millis(3000)));
    assert!(b.has_intent(|i| *i == Intent::PublishProgress(QueueProgress::new(10, 7, 3))));
    assert!(b.state.status().active);

    // C: the deadline passes
    let c = step(&b.state, TrackerInput::ClearDeadlineElapsed, t1 + Duration::from_millis(3000));
    assert_eq!(c.state, TrackerState::idle());
    assert!(c.has_intent(|i| *i == Intent::ClearProgress));
    assert!(c.has_intent(|i| *i == Intent::StopPolling));
    let status = c.state.status();
    assert!(status.progress.is_none());
    assert!(!status.active);

    // D: transport failure keeps the last progress, then recovers to idle
    let d = step(&a.state, transport("connection reset"), t1);
    assert_eq!(d.state.phase, TrackerPhase::Error);
    assert_eq!(d.state.last_progress, Some(QueueProgress::new(10, 3, 0)));
    assert!(d.state.last_error.as_deref().is_some_and(|e| e.contains("connection reset")));
    let status = d.state.status();
    assert!(!status.active);
    assert!(status.error.is_some());
    assert_eq!(status.progress, Some(QueueProgress::new(10, 3, 0)));

    let healed = step(&d.state, inactive(), t1 + Duration::from_millis(2000));
    assert_eq!(healed.state.phase, TrackerPhase::Idle);
    assert!(healed.state.last_error.is_none());
    assert!(healed.has_intent(|i| *i == Intent::ClearError));
}

#[test]
fn test_done_detection_within_one_step() {
    let now = Instant::now();
    for total in 0..=12u64 {
        for overshoot in 0..=3u64 {
            let processed = total + overshoot;
            for failed in [0, processed / 2, processed] {
                let completed = processed - failed;
                let from_active = TrackerState {
                    phase: TrackerPhase::Active,
                    last_progress: Some(QueueProgress::new(total, 0, 0)),
                    ..TrackerState::default()
                };
                for state in [TrackerState::idle(), from_active] {
                    let next = step(&state, active(total, completed, failed), now);
                    assert_eq!(
                        next.state.phase,
                        TrackerPhase::Completing,
                        "total={} completed={} failed={}",
                        total,
                        completed,
                        failed
                    );
                    assert!(next.state.pending_clear_deadline.is_some());
                }
            }
        }
    }
}

#[test]
fn test_empty_batch_completes_immediately() {
    let now = Instant::now();
    let next = step(&TrackerState::idle(), active(0, 0, 0), now);
    assert_eq!(next.state.phase, TrackerPhase::Completing);
    assert_eq!(next.state.pending_clear_deadline, Some(now + Duration::from_millis(3000)));
    assert!(next.state.last_error.is_none());
}

#[test]
fn test_vanished_session_uses_shorter_delay() {
    let now = Instant::now();
    let running = step(&TrackerState::idle(), active(5, 2, 0), now).state;

    let vanished = step(&running, inactive(), now);
    assert_eq!(vanished.state.phase, TrackerPhase::Completing);
    assert_eq!(vanished.state.pending_clear_deadline, Some(now + Duration::from_millis(2000)));
    // The last known progress stays visible until the clear.
    assert_eq!(vanished.state.last_progress, Some(QueueProgress::new(5, 2, 0)));
    assert!(!vanished.has_intent(|i| matches!(i, Intent::ClearProgress)));

    // A further empty snapshot leaves the deadline alone.
    let again = step(&vanished.state, inactive(), now + Duration::from_millis(500));
    assert!(again.is_noop());
    assert_eq!(again.state, vanished.state);
}

#[test]
fn test_clear_deadline_ignored_until_due() {
    let now = Instant::now();
    let completing = step(&TrackerState::idle(), active(4, 4, 0), now).state;

    let early = step(&completing, TrackerInput::ClearDeadlineElapsed, now + Duration::from_millis(2999));
    assert!(early.is_noop());
    assert_eq!(early.state.phase, TrackerPhase::Completing);

    // Stale deadline in other phases does nothing either.
    let idle = step(&TrackerState::idle(), TrackerInput::ClearDeadlineElapsed, now);
    assert!(idle.is_noop());
}

#[test]
fn test_new_batch_cancels_pending_clear() {
    let now = Instant::now();
    let completing = step(&TrackerState::idle(), active(3, 3, 0), now).state;

    let restarted = step(&completing, active(8, 1, 0), now + Duration::from_millis(1000));
    assert_eq!(restarted.state.phase, TrackerPhase::Active);
    assert!(restarted.state.pending_clear_deadline.is_none());
    assert!(restarted.has_intent(|i| *i == Intent::CancelClear));
    assert!(restarted.has_intent(|i| *i == Intent::PublishProgress(QueueProgress::new(8, 1, 0))));

    // The original deadline must not clear the new batch.
    let late = step(&restarted.state, TrackerInput::ClearDeadlineElapsed, now + Duration::from_millis(5000));
    assert!(late.is_noop());
    assert_eq!(late.state.phase, TrackerPhase::Active);
}

#[test]
fn test_repeated_done_snapshot_keeps_deadline() {
    let now = Instant::now();
    let completing = step(&TrackerState::idle(), active(3, 2, 1), now).state;

    let same = step(&completing, active(3, 2, 1), now + Duration::from_millis(2000));
    assert!(same.is_noop());
    assert_eq!(same.state.pending_clear_deadline, completing.pending_clear_deadline);
}

#[test]
fn test_different_done_batch_reschedules_clear() {
    let t0 = Instant::now();
    let first = step(&TrackerState::idle(), active(3, 3, 0), t0).state;
    assert_eq!(first.pending_clear_deadline, Some(t0 + Duration::from_millis(3000)));

    let t1 = t0 + Duration::from_millis(2900);
    let second = step(&first, active(8, 8, 0), t1);
    let fresh = t1 + Duration::from_millis(3000);
    assert_eq!(second.state.phase, TrackerPhase::Completing);
    assert_eq!(second.state.pending_clear_deadline, Some(fresh));
    assert_eq!(second.scheduled_clear(), Some(fresh));
    assert!(second.has_intent(|i| *i == Intent::CancelClear));
    assert!(second.has_intent(|i| *i == Intent::PublishProgress(QueueProgress::new(8, 8, 0))));

    // The first batch's deadline passing no longer clears the second batch.
    let early = step(&second.state, TrackerInput::ClearDeadlineElapsed, t0 + Duration::from_millis(3000));
    assert!(early.is_noop());
    assert_eq!(early.state.last_progress, Some(QueueProgress::new(8, 8, 0)));

    let cleared = step(&second.state, TrackerInput::ClearDeadlineElapsed, fresh);
    assert_eq!(cleared.state, TrackerState::idle());
}

#[test]
fn test_auth_failure_resets_silently() {
    let now = Instant::now();
    let running = step(&TrackerState::idle(), active(5, 1, 0), now).state;

    for err in [SnapshotError::Auth("token expired".into()), SnapshotError::MissingCredential] {
        let next = step(&running, TrackerInput::FetchFailed(err), now);
        assert_eq!(next.state, TrackerState::idle());
        assert!(!next.has_intent(|i| matches!(i, Intent::PublishError(_))));
        assert!(next.has_intent(|i| *i == Intent::ClearProgress));
    }

    // Already idle: nothing to do.
    let quiet = step(&TrackerState::idle(), TrackerInput::FetchFailed(SnapshotError::MissingCredential), now);
    assert!(quiet.is_noop());
}

#[test]
fn test_failure_while_completing_cancels_clear() {
    let now = Instant::now();
    let completing = step(&TrackerState::idle(), active(2, 2, 0), now).state;

    let failed = step(&completing, TrackerInput::FetchFailed(SnapshotError::Timeout(Duration::from_secs(5))), now);
    assert_eq!(failed.state.phase, TrackerPhase::Error);
    assert!(failed.state.pending_clear_deadline.is_none());
    assert!(failed.has_intent(|i| *i == Intent::CancelClear));
    assert_eq!(failed.state.last_progress, Some(QueueProgress::new(2, 2, 0)));
}

#[test]
fn test_error_recovers_to_active() {
    let now = Instant::now();
    let errored = step(&TrackerState::idle(), transport("dns failure"), now);
    assert_eq!(errored.state.phase, TrackerPhase::Error);
    assert!(errored.has_intent(|i| *i == Intent::StartPolling));

    let recovered = step(&errored.state, active(6, 2, 1), now);
    assert_eq!(recovered.state.phase, TrackerPhase::Active);
    assert!(recovered.state.last_error.is_none());
    assert!(recovered.has_intent(|i| *i == Intent::ClearError));
}

#[test]
fn test_active_session_without_progress_is_malformed() {
    let now = Instant::now();
    let malformed = QueueSnapshot {
        has_active_session: true,
        progress: None,
    };
    let next = step(&TrackerState::idle(), TrackerInput::Snapshot(malformed), now);
    assert_eq!(next.state.phase, TrackerPhase::Error);
    assert!(next.state.last_error.as_deref().is_some_and(|e| e.contains("malformed")));
}

#[test]
fn test_integrity_violation_is_clamped_to_done() {
    let now = Instant::now();
    let running = step(&TrackerState::idle(), active(10, 4, 0), now).state;

    let broken = step(&running, active(10, 8, 5), now);
    assert_eq!(broken.state.phase, TrackerPhase::Completing);
    assert_eq!(broken.state.last_progress, Some(QueueProgress::new(13, 8, 5)));
    assert!(broken.state.last_error.as_deref().is_some_and(|e| e.contains("exceeds total")));
    assert!(broken.has_intent(|i| matches!(i, Intent::PublishError(_))));
    assert!(broken.state.status().active);

    // A clean snapshot for a new batch clears the surfaced error.
    let next = step(&broken.state, active(4, 1, 0), now);
    assert_eq!(next.state.phase, TrackerPhase::Active);
    assert!(next.state.last_error.is_none());
}
