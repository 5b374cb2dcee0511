//! Exponential backoff for idempotent operations against flaky dependencies.
//!
//! Built on `tokio_retry::RetryIf` with a capped, jitter-free delay schedule:
//! the delay before retry `n` (0-indexed) is `min(base * 2^n, max)`.

use std::future::Future;
use std::time::Duration;
use tokio_retry::RetryIf;

/// Retry budget and delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; the operation runs at most `max_retries + 1` times.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Link lookups: 3 retries, 1 s base, 10 s cap.
    pub fn lookup() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(10))
    }

    /// Edge lookups on the hot path (domain bindings, geolocation).
    pub fn edge() -> Self {
        Self::new(1, Duration::from_millis(50), Duration::from_millis(200))
    }

    /// Delay slept before retry `retry` (0-indexed).
    pub fn delay_for(&self, retry: u32) -> Duration {
        2u32.checked_pow(retry)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Full schedule, one entry per allowed retry.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let policy = *self;
        (0..policy.max_retries).map(move |n| policy.delay_for(n))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::lookup()
    }
}

/// Runs operations under a [`RetryPolicy`].
///
/// [`Self::execute`] retries every error; [`Self::execute_if`] lets the caller
/// skip errors that repeating cannot fix. Operations must be safe to repeat.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackoffRetrier {
    policy: RetryPolicy,
}

impl BackoffRetrier {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` until it succeeds or the retry budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt once `max_retries` retries failed.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with(operation, |_, _| {}).await
    }

    /// Like [`Self::execute`], calling `on_retry(attempt, &err)` before each retry.
    ///
    /// `attempt` is the 1-based number of the failed attempt that triggered the
    /// retry. The hook never fires for the failure that exhausts the budget.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt once `max_retries` retries failed.
    pub async fn execute_with<T, E, F, Fut, R>(&self, operation: F, on_retry: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: FnMut(u32, &E),
    {
        self.execute_if(operation, |_| true, on_retry).await
    }

    /// Like [`Self::execute_with`], but an error for which `retryable` is
    /// `false` is returned at once.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the error of the last attempt
    /// once `max_retries` retries failed.
    pub async fn execute_if<T, E, F, Fut, P, R>(
        &self,
        operation: F,
        mut retryable: P,
        mut on_retry: R,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnMut(&E) -> bool,
        R: FnMut(u32, &E),
    {
        let max_retries = self.policy.max_retries;
        let mut failures: u32 = 0;

        // RetryIf consults the condition on every failure, including the last.
        let condition = |err: &E| {
            if !retryable(err) {
                return false;
            }
            failures += 1;
            if failures <= max_retries {
                on_retry(failures, err);
            }
            true
        };

        RetryIf::spawn(self.policy.delays(), operation, condition).await
    }
}
