//! Retry with randomized exponential backoff.
//!
//! [`RetryPolicy`] wraps any async operation and re-runs it until it succeeds,
//! the attempt budget runs out, or the error is judged not worth retrying.
//! Each wait is drawn uniformly from `[min, ceiling(attempt)]`, where the
//! ceiling doubles per attempt and is capped at `max`.

use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Randomized exponential wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    min: Duration,
    max: Duration,
}

impl Backoff {
    /// Create a backoff bounded by `min` and `max`. A `max` below `min` is raised to `min`.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    /// A backoff that never waits.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Upper bound of the wait that follows the given 1-based attempt.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let exp = 2f64.powi(attempt.saturating_sub(1).min(62) as i32);
        let ceiling = Duration::try_from_secs_f64(exp).unwrap_or(self.max);
        ceiling.clamp(self.min, self.max)
    }

    /// Draw the wait that follows the given 1-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let high = self.ceiling(attempt);
        if high <= self.min {
            return self.min;
        }
        let secs = rand::rng().random_range(self.min.as_secs_f64()..=high.as_secs_f64());
        Duration::from_secs_f64(secs).clamp(self.min, high)
    }
}

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

/// Attempts for single completion and generation calls.
pub const DEFAULT_COMPLETION_ATTEMPTS: u32 = 5;

/// Attempts for each item of a batch embedding request.
pub const DEFAULT_EMBEDDING_ATTEMPTS: u32 = 6;

impl RetryPolicy {
    /// Create a policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// 5 attempts, waits between 1s and 60s.
    pub fn completion() -> Self {
        Self::new(
            DEFAULT_COMPLETION_ATTEMPTS,
            Backoff::new(Duration::from_secs(1), Duration::from_secs(60)),
        )
    }

    /// 6 attempts, waits between 1s and 20s.
    pub fn embedding() -> Self {
        Self::new(
            DEFAULT_EMBEDDING_ATTEMPTS,
            Backoff::new(Duration::from_secs(1), Duration::from_secs(20)),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Run `op`, retrying on every error.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.run_if(|_: &E| true, op).await
    }

    /// Run `op`, retrying only errors for which `retryable` returns true.
    pub async fn run_if<T, E, F, Fut, P>(&self, retryable: P, mut op: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(last) => {
                    if attempt >= self.max_attempts || !retryable(&last) {
                        return Err(Exhausted {
                            attempts: attempt,
                            last,
                        });
                    }

                    let delay = self.backoff.delay_for(attempt);
                    debug!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %last,
                        "Retrying after failure"
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
        Self::completion()
    }
}

/// The operation failed on its final attempt.
#[derive(Debug)]
pub struct Exhausted<E> {
    /// Number of attempts made, including the last one.
    pub attempts: u32,
    /// Error returned by the last attempt.
    pub last: E,
}

impl<E: fmt::Display> fmt::Display for Exhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempts: {}", self.attempts, self.last)
    }
}

impl<E> std::error::Error for Exhausted<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last)
    }
}
