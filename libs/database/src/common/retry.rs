use chrono::{DateTime, TimeDelta, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How the delay grows between consecutive attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * attempt`
    Linear,
    /// `base * 2^(attempt - 1)`
    Exponential,
}

/// Retry policy shared by in-call retries and cross-sweep backoff
///
/// `delay_for(attempt)` drives the wait between attempts inside a single
/// operation, `backoff_for(retry_count)` / `is_due` drive how long a record
/// that keeps failing is left alone between sweeps. Both are derived from the
/// same base/max/growth settings.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one (never below 1)
    pub max_attempts: u32,

    /// Delay unit
    pub base_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Growth function
    pub backoff: Backoff,

    /// Whether to add jitter to in-call delays to prevent thundering herd
    pub use_jitter: bool,
}

impl RetryPolicy {
    /// Create a new retry policy with defaults
    ///
    /// Defaults:
    /// - max_attempts: 4
    /// - base_delay: 100ms
    /// - max_delay: 5s
    /// - backoff: exponential
    /// - use_jitter: true
    pub fn new() -> Self {
        Self::default()
    }

    /// Linear policy: waits `base * attempt` between attempts, no jitter
    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::MAX,
            backoff: Backoff::Linear,
            use_jitter: false,
        }
    }

    /// Exponential policy capped at `max_delay`, no jitter
    pub fn exponential(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: 1,
            base_delay,
            max_delay,
            backoff: Backoff::Exponential,
            use_jitter: false,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Disable jitter
    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Delay to wait after the `attempt`-th failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let delay = match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(attempt),
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }

    /// Backoff for a record that has already failed `retry_count` times.
    ///
    /// For the exponential policy this is `min(base * 2^retry_count, max)`.
    pub fn backoff_for(&self, retry_count: u32) -> Duration {
        self.delay_for(retry_count.saturating_add(1))
    }

    /// Earliest time the next attempt may run, `None` if it overflows
    pub fn next_attempt_at(
        &self,
        last_attempt: DateTime<Utc>,
        retry_count: u32,
    ) -> Option<DateTime<Utc>> {
        let delay = TimeDelta::from_std(self.backoff_for(retry_count)).ok()?;
        last_attempt.checked_add_signed(delay)
    }

    /// Whether a record last attempted at `last_attempt` may be retried at `now`
    pub fn is_due(
        &self,
        last_attempt: Option<DateTime<Utc>>,
        retry_count: u32,
        now: DateTime<Utc>,
    ) -> bool {
        match last_attempt {
            None => true,
            Some(last) => self
                .next_attempt_at(last, retry_count)
                .is_some_and(|due| now >= due),
        }
    }

    /// Run `operation` until it succeeds, the error is not retryable, or
    /// `max_attempts` is reached. Returns the final result together with the
    /// number of attempts made.
    ///
    /// The operation receives the 1-based attempt number.
    pub async fn run<F, Fut, T, E, R>(&self, mut operation: F, should_retry: R) -> (Result<T, E>, u32)
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        R: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retries");
                    }
                    return (Ok(result), attempt);
                }
                Err(e) => {
                    if !should_retry(&e) {
                        debug!(attempt, error = %e, "Operation failed with non-retryable error");
                        return (Err(e), attempt);
                    }

                    if attempt >= max_attempts {
                        warn!(attempts = attempt, error = %e, "Operation failed after all attempts");
                        return (Err(e), attempt);
                    }

                    let delay = if self.use_jitter {
                        apply_jitter(self.delay_for(attempt))
                    } else {
                        self.delay_for(attempt)
                    };

                    debug!(
                        "Operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                        attempt,
                        max_attempts,
                        e,
                        delay.as_millis()
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff: Backoff::Exponential,
            use_jitter: true,
        }
    }
}

/// Retry an async operation on every error according to `policy`
///
/// # Example
/// ```ignore
/// use database::common::retry::{retry_with_backoff, RetryPolicy};
///
/// let policy = RetryPolicy::new().with_max_attempts(5);
///
/// let client = retry_with_backoff(
///     || async { database::mongodb::connect(&url).await },
///     policy,
/// ).await?;
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, policy: RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    policy.run(|_| operation(), |_| true).await.0
}

/// Simplified retry with the default policy
///
/// Makes up to 4 attempts with exponential backoff starting at 100ms.
pub async fn retry<F, Fut, T, E>(operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff(operation, RetryPolicy::default()).await
}

/// Apply jitter to a delay to prevent thundering herd
///
/// Uses a random value between 50% and 100% of the original delay
fn apply_jitter(delay: Duration) -> Duration {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    let random_factor =
        (RandomState::new().hash_one(std::time::SystemTime::now()) % 50) as f64 / 100.0 + 0.5; // 0.5 to 1.0

    delay.mul_f64(random_factor)
}
