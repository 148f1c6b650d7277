// Circuit breaker guarding the external image-generation call (spec.md §7):
// five consecutive failures inside a 60s window trip it open for 30s. Small
// `parking_lot`-guarded counter struct, in the teacher's style of
// `DailyTokenTracker` (`engine/state.rs`) rather than reaching for a crate.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Closed,
    Open { opened_at: Instant },
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    first_failure_at: Option<Instant>,
}

pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    failure_threshold: u32,
    window: Duration,
    open_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, window_secs: u64, open_secs: u64) -> Self {
        CircuitBreaker {
            inner: Mutex::new(Inner { state: State::Closed, consecutive_failures: 0, first_failure_at: None }),
            failure_threshold,
            window: Duration::from_secs(window_secs),
            open_duration: Duration::from_secs(open_secs),
        }
    }

    /// `true` if the generation call should be allowed through right now.
    /// An open breaker past its `open_duration` half-opens itself (allows
    /// one attempt through, same as closing early — a single failure
    /// re-opens it via `record_failure`).
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Closed => true,
            State::Open { opened_at } => {
                if opened_at.elapsed() >= self.open_duration {
                    inner.state = State::Closed;
                    inner.consecutive_failures = 0;
                    inner.first_failure_at = None;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = 0;
        inner.first_failure_at = None;
        inner.state = State::Closed;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        let window_start = inner.first_failure_at.get_or_insert(now);
        if now.duration_since(*window_start) > self.window {
            // Outside the window — start a fresh count.
            inner.first_failure_at = Some(now);
            inner.consecutive_failures = 1;
        } else {
            inner.consecutive_failures += 1;
        }
        if inner.consecutive_failures >= self.failure_threshold {
            inner.state = State::Open { opened_at: now };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_breaker_allows_requests() {
        let breaker = CircuitBreaker::new(5, 60, 30);
        assert!(breaker.allow_request());
    }

    #[test]
    fn trips_open_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, 60, 30);
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.allow_request());
        breaker.record_failure();
        assert!(!breaker.allow_request());
    }

    #[test]
    fn success_resets_the_consecutive_failure_count() {
        let breaker = CircuitBreaker::new(3, 60, 30);
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.allow_request(), "two failures after a reset must not trip a threshold of 3");
    }

    #[test]
    fn reopens_after_cooldown_elapses() {
        let breaker = CircuitBreaker::new(1, 60, 0);
        breaker.record_failure();
        // open_secs = 0 means the cooldown has already elapsed by the time
        // we next check.
        assert!(breaker.allow_request());
    }
}
