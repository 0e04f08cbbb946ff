//! Edge-triggered latch with a cooldown window.

use std::time::{Duration, Instant};

/// Lets one trigger through, then stays disarmed until `cooldown` has passed
/// since that trigger.
///
/// The clock is supplied by the caller so the latch can be driven
/// deterministically.
#[derive(Debug, Clone)]
pub struct CooldownLatch {
    cooldown: Duration,
    fired_at: Option<Instant>,
}

impl CooldownLatch {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            fired_at: None,
        }
    }

    /// Whether a trigger at `now` would pass.
    pub fn is_armed(&self, now: Instant) -> bool {
        match self.fired_at {
            None => true,
            Some(fired_at) => now.saturating_duration_since(fired_at) >= self.cooldown,
        }
    }

    /// Attempt to fire at `now`. Returns `true` and disarms if armed.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if !self.is_armed(now) {
            return false;
        }
        self.fired_at = Some(now);
        true
    }

    /// Re-arm immediately.
    pub fn reset(&mut self) {
        self.fired_at = None;
    }
}
