//! Retry policy used by wrappers of [`crate::HttpTransport`].
//!
//! L0 itself never classifies errors as retryable; [`crate::AuthTransport`]
//! and the orchestrator manager apply this policy around their own calls.

use std::time::Duration;

use rand::Rng;

/// HTTP statuses that a wrapper should retry.
const RETRYABLE_STATUSES: &[u16] = &[408, 425, 429, 500, 502, 503, 504];

/// Whether a status code should be retried by a transport wrapper.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Exponential backoff with full jitter, honoring an optional server-supplied
/// `Retry-After`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (the first try plus retries).
    pub max_attempts: u32,
    /// Base delay for attempt 0.
    pub base_delay: Duration,
    /// Ceiling applied to the computed delay before jitter.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Default transport-level policy.
    #[must_use]
    pub fn transport_default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Default user-facing send-loop policy.
    #[must_use]
    pub fn send_loop_default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Compute the delay for `attempt` (0-indexed), applying an explicit
    /// `retry_after` override when the server specified one.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(explicit) = retry_after {
            return explicit.min(self.max_delay);
        }
        backoff_delay(attempt, self.base_delay, self.max_delay)
    }
}

/// `delay = min(maxDelay, baseDelay * 2^attempt) * rand(0.5, 1.0)`.
#[must_use]
pub fn backoff_delay(attempt: u32, base_delay: Duration, max_delay: Duration) -> Duration {
    let exp = 2u64.saturating_pow(attempt);
    let scaled = base_delay.saturating_mul(u32::try_from(exp).unwrap_or(u32::MAX));
    let capped = scaled.min(max_delay);
    let jitter = rand::thread_rng().gen_range(0.5..=1.0);
    capped.mul_f64(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses_cover_standard_transient_codes() {
        for status in [408, 425, 429, 500, 502, 503, 504] {
            assert!(is_retryable_status(status));
        }
        for status in [200, 400, 401, 403, 404] {
            assert!(!is_retryable_status(status));
        }
    }

    #[test]
    fn backoff_never_exceeds_max_delay() {
        let max = Duration::from_secs(10);
        for attempt in 0..20 {
            let d = backoff_delay(attempt, Duration::from_millis(500), max);
            assert!(d <= max);
        }
    }

    #[test]
    fn explicit_retry_after_overrides_backoff() {
        let policy = RetryPolicy::transport_default();
        let d = policy.delay_for(5, Some(Duration::from_secs(2)));
        assert_eq!(d, Duration::from_secs(2));
    }
}
