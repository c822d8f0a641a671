use std::time::Duration;

use parley_shared::constants::{
    DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS, DEFAULT_MAX_RECONNECT_ATTEMPTS,
};

const MIN_INITIAL_DELAY: Duration = Duration::from_millis(1);

/// Exponential reconnect backoff with a capped delay and a bounded number
/// of attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Retries allowed before giving up (0 disables reconnects).
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based): `initial * 2^(attempt-1)`,
    /// capped at `max_delay`. A zero `initial_delay` counts as one millisecond.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .max(MIN_INITIAL_DELAY)
            .saturating_mul(2u32.pow(exponent))
            .min(self.max_delay)
    }

    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}
