use std::fmt::Debug;
use std::time::Duration;

use crate::error::TsdbError;

/// Decides whether a failed attempt is retried and how long to wait first.
///
/// `attempt` counts retries already made, starting at 0.
pub trait RetryPolicy: Debug + Send + Sync {
    fn should_retry(&self, error: &TsdbError, attempt: u32) -> bool;

    fn delay_before_retry(&self, attempt: u32) -> Duration;
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetryPolicy;

impl RetryPolicy for NoRetryPolicy {
    fn should_retry(&self, _error: &TsdbError, _attempt: u32) -> bool {
        false
    }

    fn delay_before_retry(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// Exponential backoff: `base_interval * 2^attempt`, capped at `max_delay`,
/// for at most `max_retries` retries of retryable errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffRetryPolicy {
    max_retries: u32,
    max_delay: Duration,
    base_interval: Duration,
}

impl Default for BackoffRetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(20_000), Duration::from_millis(300))
    }
}

impl BackoffRetryPolicy {
    pub fn new(max_retries: u32, max_delay: Duration, base_interval: Duration) -> Self {
        Self {
            max_retries,
            max_delay,
            base_interval,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn base_interval(&self) -> Duration {
        self.base_interval
    }
}

impl RetryPolicy for BackoffRetryPolicy {
    fn should_retry(&self, error: &TsdbError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }

    fn delay_before_retry(&self, attempt: u32) -> Duration {
        // 2^31 already dwarfs any sane cap.
        let factor = 1u32 << attempt.min(31);
        self.base_interval
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    fn unavailable() -> TsdbError {
        TsdbError::Service(ServiceError {
            status: 503,
            code: "ServiceUnavailable".to_string(),
            message: "busy".to_string(),
            request_id: None,
        })
    }

    #[test]
    fn test_backoff_delays() {
        let policy = BackoffRetryPolicy::default();
        assert_eq!(policy.delay_before_retry(0), Duration::from_millis(300));
        assert_eq!(policy.delay_before_retry(1), Duration::from_millis(600));
        assert_eq!(policy.delay_before_retry(2), Duration::from_millis(1200));
        assert_eq!(policy.delay_before_retry(7), Duration::from_millis(20_000));
        assert_eq!(policy.delay_before_retry(100), Duration::from_millis(20_000));
    }

    #[test]
    fn test_backoff_respects_max_retries() {
        let policy = BackoffRetryPolicy::default();
        assert!(policy.should_retry(&unavailable(), 0));
        assert!(policy.should_retry(&unavailable(), 2));
        assert!(!policy.should_retry(&unavailable(), 3));
    }

    #[test]
    fn test_backoff_skips_permanent_errors() {
        let policy = BackoffRetryPolicy::default();
        let err = TsdbError::Service(ServiceError {
            status: 403,
            code: "AccessDenied".to_string(),
            message: "no".to_string(),
            request_id: None,
        });
        assert!(!policy.should_retry(&err, 0));
    }

    #[test]
    fn test_no_retry_policy() {
        assert!(!NoRetryPolicy.should_retry(&unavailable(), 0));
    }
}
