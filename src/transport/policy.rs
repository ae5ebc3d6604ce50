use std::time::Duration;

use crate::error::FailureKind;

/// How long a single attempt may wait for the server.
///
/// Every call site picks one explicitly. `Unbounded` only lifts the
/// per-attempt deadline; the attempt cap still applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Abort the attempt and report 408 once the duration elapses.
    Bounded(Duration),
    /// Wait as long as the server needs (slow inference backends).
    Unbounded,
}

/// Retry behavior shared by every transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per logical call, first one included.
    pub max_attempts: u32,
    /// Linear backoff step.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay after a failed attempt using linear backoff.
    /// delay = backoff_step * attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }

    /// Only no-response, 408 and 5xx outcomes are worth another attempt.
    pub fn should_retry(&self, status: u16) -> bool {
        FailureKind::from_status(status) == FailureKind::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(3000));
    }

    #[test]
    fn retry_decisions() {
        let policy = RetryPolicy::default();
        for status in [0, 408, 500, 502, 503, 504] {
            assert!(policy.should_retry(status), "{status} should retry");
        }
        for status in [200, 201, 400, 401, 403, 404, 413, 415, 422] {
            assert!(!policy.should_retry(status), "{status} should not retry");
        }
    }
}
