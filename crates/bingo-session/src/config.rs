use std::time::Duration;

use serde::Deserialize;

/// Cadences and limits for a running session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Room/draw poll period while a game is running.
    pub poll_interval_ms: u64,
    /// Room poll period while waiting for a rematch or an opponent.
    pub rematch_poll_interval_ms: u64,
    /// Countdown length of the turn timer, in ticks.
    pub turn_ticks: u32,
    /// Length of one turn timer tick.
    pub tick_interval_ms: u64,
    /// Upper bound on any single request to the authority.
    pub request_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            rematch_poll_interval_ms: 2000,
            turn_ticks: 10,
            tick_interval_ms: 1000,
            request_timeout_ms: 5000,
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn rematch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.rematch_poll_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Every period and the tick count must be non-zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ms == 0 {
            return Err("session.poll_interval_ms must be > 0".to_string());
        }
        if self.rematch_poll_interval_ms == 0 {
            return Err("session.rematch_poll_interval_ms must be > 0".to_string());
        }
        if self.turn_ticks == 0 {
            return Err("session.turn_ticks must be > 0".to_string());
        }
        if self.tick_interval_ms == 0 {
            return Err("session.tick_interval_ms must be > 0".to_string());
        }
        if self.request_timeout_ms == 0 {
            return Err("session.request_timeout_ms must be > 0".to_string());
        }
        Ok(())
    }
}
