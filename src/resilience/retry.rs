//! Opt-in retry with exponential backoff.
//!
//! The request pipeline never retries on its own; callers wrap whole pipeline
//! calls in a [`RetryPolicy`] and decide which failures qualify.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::Settings;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub backoff_factor: f64,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 2.0,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_attempts: settings.max_retries,
            backoff_factor: settings.retry_backoff_factor,
            ..Default::default()
        }
    }

    /// A policy that runs the operation exactly once.
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Default::default() }
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.min_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let secs = secs.clamp(self.min_delay.as_secs_f64(), self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Run `op` until it succeeds, `should_retry` rejects the error, or the
    /// attempt budget is spent. The last error is returned unchanged. Failures
    /// are not logged here; `op` logs its own.
    pub async fn run<T, E, F, Fut, P>(&self, mut should_retry: P, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnMut(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && should_retry(&e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying failed operation"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_delay_grows_and_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_retryable_errors_until_success() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result = policy
            .run(AppError::is_retryable, || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AppError::timeout("GET apis", 30))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.ok(), Some("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_rejected_errors() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), AppError> = policy
            .run(AppError::is_retryable, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::external_service("apigee_api", "Rate limit exceeded").with_status(429))
            })
            .await;

        assert_eq!(result.err().map(|e| e.status()), Some(429));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy { max_attempts: 2, ..Default::default() };
        let calls = AtomicU32::new(0);

        let result: Result<(), AppError> = policy
            .run(AppError::is_retryable, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::external_service("apigee_api", "boom").with_status(500))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_none_runs_once() {
        let calls = AtomicU32::new(0);
        let _: Result<(), AppError> = RetryPolicy::none()
            .run(|_| true, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::internal("x"))
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
