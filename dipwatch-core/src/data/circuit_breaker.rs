//! Circuit breaker for the market data provider.
//!
//! HTTP 403 (IP ban) opens the breaker immediately; three consecutive failures
//! open it too. While open, every request fails fast so the remaining watchlist
//! entries are reported as fetch failures instead of hammering the provider.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct BreakerState {
    opened_at: Option<Instant>,
    consecutive_failures: u32,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState {
                opened_at: None,
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold: 3,
        }
    }

    /// 30-minute cooldown.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_secs(30 * 60))
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut BreakerState) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Whether a request may go out now. Closes the breaker once the cooldown
    /// has elapsed.
    pub fn is_allowed(&self) -> bool {
        let cooldown = self.cooldown;
        self.with_state(|s| match s.opened_at {
            None => true,
            Some(at) if at.elapsed() >= cooldown => {
                s.opened_at = None;
                s.consecutive_failures = 0;
                true
            }
            Some(_) => false,
        })
    }

    pub fn record_success(&self) {
        self.with_state(|s| s.consecutive_failures = 0);
    }

    pub fn record_failure(&self) {
        let threshold = self.failure_threshold;
        self.with_state(|s| {
            s.consecutive_failures += 1;
            if s.consecutive_failures >= threshold {
                s.opened_at = Some(Instant::now());
            }
        });
    }

    /// Open immediately (403 Forbidden).
    pub fn trip(&self) {
        self.with_state(|s| s.opened_at = Some(Instant::now()));
    }

    pub fn remaining_cooldown(&self) -> Duration {
        let cooldown = self.cooldown;
        self.with_state(|s| match s.opened_at {
            None => Duration::ZERO,
            Some(at) => cooldown.saturating_sub(at.elapsed()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_three_failures() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_allowed());
        cb.record_failure();
        assert!(!cb.is_allowed());
        assert!(cb.remaining_cooldown() > Duration::ZERO);
    }

    #[test]
    fn success_resets_the_count() {
        let cb = CircuitBreaker::new(Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert!(cb.is_allowed());
    }

    #[test]
    fn trip_then_cooldown_expires() {
        let cb = CircuitBreaker::new(Duration::from_millis(10));
        cb.trip();
        assert!(!cb.is_allowed());
        std::thread::sleep(Duration::from_millis(15));
        assert!(cb.is_allowed());
        assert_eq!(cb.remaining_cooldown(), Duration::ZERO);
    }
}
