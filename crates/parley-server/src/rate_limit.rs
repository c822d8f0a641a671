//! Per-connection message budget.

use std::time::{Duration, Instant};

/// Refilling allowance of relayed messages for one socket.
///
/// Starts full at `burst` and regains `per_second` messages per second,
/// never exceeding `burst`.
#[derive(Debug, Clone)]
pub struct MessageBudget {
    available: f64,
    burst: f64,
    per_second: f64,
    refreshed_at: Instant,
}

impl MessageBudget {
    pub fn new(per_second: f64, burst: f64) -> Self {
        Self::starting_at(per_second, burst, Instant::now())
    }

    fn starting_at(per_second: f64, burst: f64, now: Instant) -> Self {
        Self {
            available: burst,
            burst,
            per_second,
            refreshed_at: now,
        }
    }

    /// Spend one message. `false` means the sender is over budget.
    pub fn spend(&mut self) -> bool {
        self.spend_at(Instant::now())
    }

    fn spend_at(&mut self, now: Instant) -> bool {
        let idle = now.saturating_duration_since(self.refreshed_at);
        self.refreshed_at = now;
        self.available = (self.available + idle.as_secs_f64() * self.per_second).min(self.burst);

        if self.available < 1.0 {
            return false;
        }
        self.available -= 1.0;
        true
    }

    /// Time until the next message would be accepted.
    pub fn retry_after(&self) -> Duration {
        if self.available >= 1.0 || self.per_second <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64((1.0 - self.available) / self.per_second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_empty() {
        let start = Instant::now();
        let mut budget = MessageBudget::starting_at(1.0, 3.0, start);
        assert!(budget.spend_at(start));
        assert!(budget.spend_at(start));
        assert!(budget.spend_at(start));
        assert!(!budget.spend_at(start));
        assert!(budget.retry_after() > Duration::ZERO);
    }

    #[test]
    fn test_refills_over_time_up_to_burst() {
        let start = Instant::now();
        let mut budget = MessageBudget::starting_at(2.0, 2.0, start);
        assert!(budget.spend_at(start));
        assert!(budget.spend_at(start));
        assert!(!budget.spend_at(start));

        // Half a second at 2/s buys exactly one message.
        let later = start + Duration::from_millis(500);
        assert!(budget.spend_at(later));
        assert!(!budget.spend_at(later));

        // A long pause never grants more than the burst.
        let much_later = later + Duration::from_secs(60);
        assert!(budget.spend_at(much_later));
        assert!(budget.spend_at(much_later));
        assert!(!budget.spend_at(much_later));
    }

    #[test]
    fn test_retry_after_is_zero_with_budget_left() {
        let budget = MessageBudget::new(5.0, 20.0);
        assert_eq!(budget.retry_after(), Duration::ZERO);
    }
}
