use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Opens after `failure_threshold` consecutive failures and rejects requests
/// until `cooldown` has passed, then lets a trial request through.
pub struct CircuitBreaker {
    consecutive_failures: AtomicUsize,
    open: AtomicBool,
    opened_at: Mutex<Option<Instant>>,
    failure_threshold: usize,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: usize, cooldown: Duration) -> Self {
        Self {
            consecutive_failures: AtomicUsize::new(0),
            open: AtomicBool::new(false),
            opened_at: Mutex::new(None),
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
        *self.opened_at.lock() = None;
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.failure_threshold {
            if !self.open.swap(true, Ordering::SeqCst) {
                tracing::warn!("Circuit breaker opened after {} failures", failures);
            }
            *self.opened_at.lock() = Some(Instant::now());
        }
    }

    pub fn allows_request(&self) -> bool {
        if !self.open.load(Ordering::SeqCst) {
            return true;
        }
        self.opened_at
            .lock()
            .map(|opened| opened.elapsed() >= self.cooldown)
            .unwrap_or(true)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.allows_request());
        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(!breaker.allows_request());
    }

    #[test]
    fn test_success_closes() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        breaker.record_failure();
        assert!(!breaker.allows_request());
        breaker.record_success();
        assert!(breaker.allows_request());
    }

    #[test]
    fn test_trial_request_after_cooldown() {
        let breaker = CircuitBreaker::new(1, Duration::ZERO);
        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(breaker.allows_request());
    }
}
