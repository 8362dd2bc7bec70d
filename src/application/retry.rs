//! Bounded exponential backoff for remote calls that hit a rate limit.
//!
//! Only rate-limit failures are retried; every other error is returned after
//! the first attempt. Delays go through a [`Sleeper`] so backoff suspends the
//! calling task cooperatively and tests can observe delays without waiting.

use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use super::error::ApiError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Errors that can signal "slow down and try again later".
pub trait RetryableError {
    fn is_rate_limited(&self) -> bool;
}

impl RetryableError for ApiError {
    fn is_rate_limited(&self) -> bool {
        ApiError::is_rate_limited(self)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PolicyError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("backoff_multiplier must be a finite number >= 1 (got {0})")]
    InvalidMultiplier(f64),
}

/// Retry parameters for one call site. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: NonZeroU32,
    base_delay: Duration,
    backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::MIN.saturating_add(DEFAULT_MAX_ATTEMPTS - 1),
            base_delay: DEFAULT_BASE_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        backoff_multiplier: f64,
    ) -> Result<Self, PolicyError> {
        let max_attempts = NonZeroU32::new(max_attempts).ok_or(PolicyError::ZeroAttempts)?;
        if !backoff_multiplier.is_finite() || backoff_multiplier < 1.0 {
            return Err(PolicyError::InvalidMultiplier(backoff_multiplier));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            backoff_multiplier,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Delay after the failed attempt with 0-based `attempt_index`:
    /// `base_delay * multiplier^attempt_index`, saturating at `Duration::MAX`.
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.powi(exponent);
        let nanos = self.base_delay.as_nanos() as f64 * factor;
        if nanos.is_finite() && nanos < u64::MAX as f64 {
            Duration::from_nanos(nanos.round() as u64)
        } else {
            Duration::MAX
        }
    }
}

/// Suspends the current task for a while.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `operation` under `policy`, backing off between rate-limited attempts.
///
/// Every call keeps its own attempt counter; nothing is shared between calls.
pub async fn execute<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError,
{
    let max_attempts = policy.max_attempts();
    let mut attempt: u32 = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        attempt += 1;

        if !err.is_rate_limited() {
            debug!(attempt, "remote call failed without a rate-limit signal");
            return Err(err);
        }

        if attempt >= max_attempts {
            counter!("folio_retry_exhausted_total").increment(1);
            warn!(attempts = attempt, "rate limited; retries exhausted");
            return Err(err);
        }

        let delay = policy.delay_for(attempt - 1);
        counter!("folio_retry_attempts_total").increment(1);
        warn!(
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "rate limited; backing off"
        );
        sleeper.sleep(delay).await;
    }
}

/// A policy bundled with the sleeper used to wait between attempts.
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    pub fn tokio(policy: RetryPolicy) -> Self {
        Self::new(policy, Arc::new(TokioSleeper))
    }

    /// Same sleeper, different policy for a specific call site.
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            policy,
            sleeper: Arc::clone(&self.sleeper),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError,
    {
        execute(&self.policy, self.sleeper.as_ref(), operation).await
    }
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn delays(&self) -> Vec<Duration> {
            self.delays.lock().expect("delays lock").clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().expect("delays lock").push(duration);
        }
    }

    #[test]
    fn default_policy_matches_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.base_delay(), Duration::from_millis(500));
        assert_eq!(policy.backoff_multiplier(), 2.0);
    }

    #[test]
    fn policy_rejects_out_of_range_values() {
        assert_eq!(
            RetryPolicy::new(0, Duration::ZERO, 2.0),
            Err(PolicyError::ZeroAttempts)
        );
        assert!(RetryPolicy::new(3, Duration::ZERO, 0.5).is_err());
        assert!(RetryPolicy::new(3, Duration::ZERO, f64::NAN).is_err());
    }

    #[test]
    fn delay_grows_geometrically_and_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(10_000), Duration::MAX);
    }

    #[tokio::test]
    async fn rate_limited_twice_then_success() {
        let sleeper = RecordingSleeper::default();
        let attempts = AtomicU32::new(0);

        let result = execute(&RetryPolicy::default(), &sleeper, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n <= 2 {
                    Err(ApiError::RateLimited)
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let sleeper = RecordingSleeper::default();
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(10), 2.0).expect("policy");

        let result: Result<(), ApiError> = execute(&policy, &sleeper, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::from_status(500, "boom")) }
        })
        .await;

        assert!(matches!(result, Err(ApiError::Server { status: 500, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_failure() {
        let sleeper = RecordingSleeper::default();
        let attempts = AtomicU32::new(0);

        let result: Result<(), ApiError> = execute(&RetryPolicy::default(), &sleeper, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::RateLimited) }
        })
        .await;

        assert_eq!(result, Err(ApiError::RateLimited));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.delays().len(), 2);
    }

    #[tokio::test]
    async fn single_attempt_policy_never_sleeps() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::new(1, Duration::from_secs(1), 1.0).expect("policy");
        let result: Result<(), ApiError> =
            execute(&policy, &sleeper, || async { Err(ApiError::RateLimited) }).await;
        assert_eq!(result, Err(ApiError::RateLimited));
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_does_not_block_other_operations() {
        let executor = RetryExecutor::tokio(RetryPolicy::default());
        let finished = Mutex::new(Vec::new());
        let first_attempts = AtomicU32::new(0);

        let slow = async {
            let result = executor
                .run(|| {
                    let n = first_attempts.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            Err(ApiError::RateLimited)
                        } else {
                            Ok("retried")
                        }
                    }
                })
                .await;
            finished.lock().expect("finished lock").push("retried");
            result
        };
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            finished.lock().expect("finished lock").push("fast");
        };

        let (slow_result, ()) = tokio::join!(slow, fast);
        assert_eq!(slow_result, Ok("retried"));
        assert_eq!(
            *finished.lock().expect("finished lock"),
            vec!["fast", "retried"]
        );
    }
}
