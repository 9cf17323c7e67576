//! Request pacing and retry policy.
//!
//! [`RateLimiter`] keeps consecutive request starts at least `delay` apart.
//! The wait is a tokio timer, so tests run it on a paused clock.
//! [`RetryPolicy`] decides, per failed attempt, whether to back off and try
//! again or give up on the query.

use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::config::RunConfig;
use crate::error::BackendError;

/// Enforces a minimum spacing between request starts.
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    jitter: Duration,
    last_start: Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter with a fixed delay and no jitter.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
            last_start: None,
        }
    }

    /// Adds a random extra delay in `[0, jitter)` to every wait.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns the configured minimum delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until the next request may start, then records its start.
    ///
    /// The first request never waits.
    pub async fn before_request(&mut self) {
        if let Some(last) = self.last_start {
            let target = last + self.delay + self.sample_jitter();
            if target > Instant::now() {
                debug!(wait_ms = (target - Instant::now()).as_millis() as u64, "Pacing request");
                sleep_until(target).await;
            }
        }
        self.last_start = Some(Instant::now());
    }

    fn sample_jitter(&self) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        self.jitter.mul_f64(rand::thread_rng().gen::<f64>())
    }
}

/// What to do after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The attempt succeeded.
    Proceed,
    /// Wait, then retry the same query.
    RetryAfter(Duration),
    /// Give up on this query.
    Abort,
}

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per query, including the first.
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Cap on any single backoff.
    pub max_backoff: Duration,
    /// Growth factor between consecutive backoffs.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Builds the policy from run settings.
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            ..Default::default()
        }
    }

    /// Backoff after the given (1-based) failed attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_backoff.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_backoff)
    }

    /// Decides what follows the given (1-based) attempt.
    ///
    /// Rate limiting and network failures are retried until `max_attempts`
    /// is reached. Authentication and parse failures are never retried.
    pub fn on_result(&self, attempt: u32, error: Option<&BackendError>) -> RetryDecision {
        match error {
            None => RetryDecision::Proceed,
            Some(BackendError::RateLimited(_)) | Some(BackendError::Unreachable(_)) => {
                if attempt < self.max_attempts {
                    RetryDecision::RetryAfter(self.backoff_for(attempt))
                } else {
                    RetryDecision::Abort
                }
            }
            Some(BackendError::AuthFailed(_)) | Some(BackendError::ParseFailure(_)) => {
                RetryDecision::Abort
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_does_not_wait() {
        let mut limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        limiter.before_request().await;
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_requests_are_spaced() {
        let mut limiter = RateLimiter::new(Duration::from_millis(100));
        let mut starts = Vec::new();
        for _ in 0..50 {
            limiter.before_request().await;
            starts.push(Instant::now());
        }
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_time_counts_toward_delay() {
        let mut limiter = RateLimiter::new(Duration::from_secs(2));
        limiter.before_request().await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        let before = Instant::now();
        limiter.before_request().await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_stays_within_bounds() {
        let mut limiter =
            RateLimiter::new(Duration::from_millis(100)).with_jitter(Duration::from_millis(50));
        limiter.before_request().await;
        for _ in 0..20 {
            let before = Instant::now();
            limiter.before_request().await;
            let waited = Instant::now() - before;
            assert!(waited >= Duration::from_millis(100));
            assert!(waited <= Duration::from_millis(150));
        }
    }

    #[tokio::test]
    async fn test_zero_delay_never_waits() {
        let mut limiter = RateLimiter::new(Duration::ZERO);
        let start = std::time::Instant::now();
        for _ in 0..10 {
            limiter.before_request().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(limiter.delay(), Duration::ZERO);
    }

    #[test]
    fn test_backoff_exponential_and_capped() {
        let policy = RetryPolicy {
            max_backoff: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_for(10), Duration::from_secs(5));
    }

    #[test]
    fn test_on_result_success_proceeds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.on_result(1, None), RetryDecision::Proceed);
    }

    #[test]
    fn test_rate_limited_retries_until_last_attempt() {
        let policy = RetryPolicy::default();
        let err = BackendError::RateLimited("HTTP 429".into());
        assert_eq!(
            policy.on_result(1, Some(&err)),
            RetryDecision::RetryAfter(Duration::from_secs(1))
        );
        assert_eq!(
            policy.on_result(2, Some(&err)),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(policy.on_result(3, Some(&err)), RetryDecision::Abort);
    }

    #[test]
    fn test_unreachable_is_retried() {
        let policy = RetryPolicy::default();
        let err = BackendError::Unreachable("timeout".into());
        assert!(matches!(policy.on_result(1, Some(&err)), RetryDecision::RetryAfter(_)));
    }

    #[test]
    fn test_auth_failure_never_retried() {
        let policy = RetryPolicy::default();
        let err = BackendError::AuthFailed("HTTP 401".into());
        assert_eq!(policy.on_result(1, Some(&err)), RetryDecision::Abort);
    }

    #[test]
    fn test_parse_failure_not_retried() {
        let policy = RetryPolicy::default();
        let err = BackendError::ParseFailure("bad json".into());
        assert_eq!(policy.on_result(1, Some(&err)), RetryDecision::Abort);
    }

    #[test]
    fn test_from_config() {
        let config = RunConfig {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(250),
            ..Default::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff_for(1), Duration::from_millis(250));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(500));
        assert_eq!(policy.max_backoff, Duration::from_secs(60));
    }

    #[test]
    fn test_single_attempt_policy() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        };
        let err = BackendError::RateLimited("429".into());
        assert_eq!(policy.on_result(1, Some(&err)), RetryDecision::Abort);
    }
}
