//! Tracker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::machine::{COMPLETED_CLEAR_DELAY, ClearDelays, VANISHED_CLEAR_DELAY};

/// Default interval between poll ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(2000);

/// Default window during which repeated refresh requests collapse into one.
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_millis(500);

/// Configuration for one tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Interval between poll ticks (milliseconds).
    pub tick_interval_ms: u64,
    /// Display time after an explicit done snapshot (milliseconds).
    pub completed_clear_delay_ms: u64,
    /// Display time after the session vanished (milliseconds).
    pub vanished_clear_delay_ms: u64,
    /// Cooldown between out-of-band refreshes (milliseconds, 0 disables).
    pub refresh_cooldown_ms: u64,
    /// Upper bound on one snapshot fetch (milliseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_ms: Option<u64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
            completed_clear_delay_ms: COMPLETED_CLEAR_DELAY.as_millis() as u64,
            vanished_clear_delay_ms: VANISHED_CLEAR_DELAY.as_millis() as u64,
            refresh_cooldown_ms: DEFAULT_REFRESH_COOLDOWN.as_millis() as u64,
            fetch_timeout_ms: None,
        }
    }
}

impl TrackerConfig {
    pub const ENV_TICK_INTERVAL: &'static str = "PROGRESS_TICK_INTERVAL_MS";
    pub const ENV_COMPLETED_CLEAR: &'static str = "PROGRESS_COMPLETED_CLEAR_MS";
    pub const ENV_VANISHED_CLEAR: &'static str = "PROGRESS_VANISHED_CLEAR_MS";
    pub const ENV_REFRESH_COOLDOWN: &'static str = "PROGRESS_REFRESH_COOLDOWN_MS";
    pub const ENV_FETCH_TIMEOUT: &'static str = "PROGRESS_FETCH_TIMEOUT_MS";

    /// Build a config from `PROGRESS_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup over the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |key: &str| -> Result<Option<u64>, ConfigError> {
            match lookup(key) {
                None => Ok(None),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ConfigError::Parse {
                        key: key.to_string(),
                        value: raw,
                    }),
            }
        };

        let mut config = Self::default();
        if let Some(ms) = parse(Self::ENV_TICK_INTERVAL)? {
            config.tick_interval_ms = ms;
        }
        if let Some(ms) = parse(Self::ENV_COMPLETED_CLEAR)? {
            config.completed_clear_delay_ms = ms;
        }
        if let Some(ms) = parse(Self::ENV_VANISHED_CLEAR)? {
            config.vanished_clear_delay_ms = ms;
        }
        if let Some(ms) = parse(Self::ENV_REFRESH_COOLDOWN)? {
            config.refresh_cooldown_ms = ms;
        }
        if let Some(ms) = parse(Self::ENV_FETCH_TIMEOUT)? {
            config.fetch_timeout_ms = Some(ms);
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that the values can drive a tracker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Zero("tick_interval_ms"));
        }
        if self.fetch_timeout_ms == Some(0) {
            return Err(ConfigError::Zero("fetch_timeout_ms"));
        }
        if self.completed_clear_delay_ms == self.vanished_clear_delay_ms {
            return Err(ConfigError::IdenticalClearDelays(
                self.completed_clear_delay_ms,
            ));
        }
        Ok(())
    }

    /// Set the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set both clear delays.
    pub fn with_clear_delays(mut self, completed: Duration, vanished: Duration) -> Self {
        self.completed_clear_delay_ms = completed.as_millis() as u64;
        self.vanished_clear_delay_ms = vanished.as_millis() as u64;
        self
    }

    /// Set the refresh cooldown.
    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown_ms = cooldown.as_millis() as u64;
        self
    }

    /// Bound every fetch by `timeout`.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn refresh_cooldown(&self) -> Duration {
        Duration::from_millis(self.refresh_cooldown_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }

    /// Clear delays in the form the state machine consumes.
    pub fn clear_delays(&self) -> ClearDelays {
        ClearDelays {
            completed: Duration::from_millis(self.completed_clear_delay_ms),
            vanished: Duration::from_millis(self.vanished_clear_delay_ms),
        }
    }
}
