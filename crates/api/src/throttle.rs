//! Per-IP login failure throttling.
//!
//! Failures are tracked in a process-local map from IP to failure instants.
//! A configurable sliding window and attempt threshold define lockout; a
//! locked IP is rejected before credentials are consulted, and a successful
//! login clears the IP's history. Staff and customer planes each hold their
//! own instance. State is in-memory only and unbounded across distinct IPs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window failure tracker for one identity plane.
pub struct LoginThrottle {
    window: Duration,
    max_attempts: usize,
    failures: Mutex<HashMap<String, Vec<Instant>>>,
}

impl LoginThrottle {
    pub fn new(window_secs: u64, max_attempts: usize) -> Self {
        Self {
            window: Duration::from_secs(window_secs),
            max_attempts,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// If the IP is locked out, returns the seconds until its oldest
    /// relevant failure leaves the window.
    pub fn locked_for(&self, ip: &str) -> Option<u64> {
        let now = Instant::now();
        let mut failures = self.failures.lock().expect("throttle lock poisoned");
        let attempts = Self::trim(&mut failures, ip, now, self.window);
        if attempts.len() >= self.max_attempts {
            let oldest = attempts[0];
            let retry_after = self.window.saturating_sub(now - oldest);
            Some(retry_after.as_secs().max(1))
        } else {
            None
        }
    }

    /// Record one failed attempt for the IP.
    pub fn record_failure(&self, ip: &str) {
        let now = Instant::now();
        let mut failures = self.failures.lock().expect("throttle lock poisoned");
        let attempts = Self::trim(&mut failures, ip, now, self.window);
        attempts.push(now);
    }

    /// Forget the IP's failure history after a successful login.
    pub fn clear(&self, ip: &str) {
        self.failures
            .lock()
            .expect("throttle lock poisoned")
            .remove(ip);
    }

    /// Drop entries older than the window and return the IP's live list.
    fn trim<'a>(
        failures: &'a mut HashMap<String, Vec<Instant>>,
        ip: &str,
        now: Instant,
        window: Duration,
    ) -> &'a mut Vec<Instant> {
        let attempts = failures.entry(ip.to_string()).or_default();
        attempts.retain(|ts| now.duration_since(*ts) < window);
        attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_after_max_attempts() {
        let throttle = LoginThrottle::new(60, 3);
        assert!(throttle.locked_for("203.0.113.9").is_none());

        for _ in 0..3 {
            throttle.record_failure("203.0.113.9");
        }
        let retry = throttle.locked_for("203.0.113.9").expect("should be locked");
        assert!(retry >= 1 && retry <= 60);
    }

    #[test]
    fn other_ips_are_unaffected() {
        let throttle = LoginThrottle::new(60, 2);
        throttle.record_failure("203.0.113.9");
        throttle.record_failure("203.0.113.9");
        assert!(throttle.locked_for("203.0.113.9").is_some());
        assert!(throttle.locked_for("198.51.100.1").is_none());
    }

    #[test]
    fn clear_resets_the_counter() {
        let throttle = LoginThrottle::new(60, 2);
        throttle.record_failure("203.0.113.9");
        throttle.record_failure("203.0.113.9");
        throttle.clear("203.0.113.9");
        assert!(throttle.locked_for("203.0.113.9").is_none());
    }

    #[test]
    fn failures_expire_with_the_window() {
        let throttle = LoginThrottle::new(0, 1);
        throttle.record_failure("203.0.113.9");
        // A zero-second window expires entries as soon as any time passes.
        std::thread::sleep(Duration::from_millis(5));
        assert!(throttle.locked_for("203.0.113.9").is_none());
    }
}
