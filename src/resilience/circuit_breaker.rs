//! Circuit breaker guarding calls to the gateway.
//!
//! - Closed: calls pass through; consecutive failures are counted
//! - Open: calls fail immediately until the recovery timeout has elapsed
//! - HalfOpen: a single trial call decides between Closed and Open
//!
//! The Open to HalfOpen transition is evaluated lazily on the next call.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Outcome of a call made through the breaker.
#[derive(Debug, thiserror::Error)]
pub enum CircuitError<E> {
    /// The call was rejected without being attempted.
    #[error("Circuit '{name}' is open; retry after {}s", .retry_after.as_secs())]
    Open { name: String, retry_after: Duration },

    /// The call was attempted and failed.
    #[error(transparent)]
    Inner(E),
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    state: Mutex<BreakerState>,
}

/// Admission ticket for one call. A trial ticket dropped without an outcome
/// (the caller's future was cancelled) is recorded as a failure.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl CallPermit<'_> {
    fn success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    fn failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            warn!(circuit = %self.breaker.name, "Trial call cancelled before completion");
            self.breaker.on_failure(true);
        }
    }
}

impl CircuitBreaker {
    pub fn new<S: Into<String>>(name: S, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn recovery_timeout(&self) -> Duration {
        self.recovery_timeout
    }

    /// Recorded state. An Open circuit whose timeout has elapsed still reports
    /// Open until the next call moves it to HalfOpen.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        state.state = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.opened_at = None;
        state.trial_in_flight = false;
    }

    /// Run `op` under the breaker. Any `Err` from `op` counts as a failure.
    pub async fn call<F, Fut, T, E>(&self, op: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = match self.admit() {
            Ok(permit) => permit,
            Err(retry_after) => {
                return Err(CircuitError::Open { name: self.name.clone(), retry_after });
            }
        };

        match op().await {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(e) => {
                permit.failure();
                Err(CircuitError::Inner(e))
            }
        }
    }

    fn admit(&self) -> Result<CallPermit<'_>, Duration> {
        let mut state = self.lock();
        match state.state {
            CircuitState::Closed => Ok(CallPermit { breaker: self, trial: false, settled: false }),
            CircuitState::Open => {
                let elapsed = state.opened_at.map(|at| at.elapsed()).unwrap_or(self.recovery_timeout);
                if elapsed < self.recovery_timeout {
                    return Err(self.recovery_timeout - elapsed);
                }
                info!(circuit = %self.name, "Circuit half-open, admitting trial call");
                state.state = CircuitState::HalfOpen;
                state.trial_in_flight = true;
                Ok(CallPermit { breaker: self, trial: true, settled: false })
            }
            CircuitState::HalfOpen => {
                if state.trial_in_flight {
                    return Err(Duration::ZERO);
                }
                state.trial_in_flight = true;
                Ok(CallPermit { breaker: self, trial: true, settled: false })
            }
        }
    }

    fn on_success(&self, trial: bool) {
        let mut state = self.lock();
        if trial {
            info!(circuit = %self.name, "Trial call succeeded, circuit closed");
            state.state = CircuitState::Closed;
            state.consecutive_failures = 0;
            state.opened_at = None;
            state.trial_in_flight = false;
        } else if state.state == CircuitState::Closed {
            state.consecutive_failures = 0;
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut state = self.lock();
        if trial {
            warn!(circuit = %self.name, "Trial call failed, circuit re-opened");
            state.state = CircuitState::Open;
            state.opened_at = Some(Instant::now());
            state.trial_in_flight = false;
            return;
        }

        if state.state != CircuitState::Closed {
            return;
        }

        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.failure_threshold {
            warn!(
                circuit = %self.name,
                failures = state.consecutive_failures,
                recovery_timeout_secs = self.recovery_timeout.as_secs(),
                "Failure threshold reached, circuit opened"
            );
            state.state = CircuitState::Open;
            state.opened_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new("apigee_api", 3, Duration::from_secs(60))
    }

    async fn fail(breaker: &CircuitBreaker) {
        let result = breaker.call(|| async { Err::<(), _>(Boom) }).await;
        assert!(matches!(result, Err(CircuitError::Inner(Boom))));
    }

    async fn succeed(breaker: &CircuitBreaker) -> Result<(), CircuitError<Boom>> {
        breaker.call(|| async { Ok::<_, Boom>(()) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold_and_fails_fast() {
        let breaker = breaker();
        for _ in 0..3 {
            fail(&breaker).await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let invoked = AtomicUsize::new(0);
        let result = breaker
            .call(|| async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Boom>(())
            })
            .await;

        match result {
            Err(CircuitError::Open { name, retry_after }) => {
                assert_eq!(name, "apigee_api");
                assert_eq!(retry_after, Duration::from_secs(60));
            }
            other => panic!("expected open circuit, got {:?}", other),
        }
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_count() {
        let breaker = breaker();
        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.failure_count(), 2);

        succeed(&breaker).await.expect("closed circuit admits calls");
        assert_eq!(breaker.failure_count(), 0);

        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_success_closes_circuit() {
        let breaker = breaker();
        for _ in 0..3 {
            fail(&breaker).await;
        }

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(matches!(succeed(&breaker).await, Err(CircuitError::Open { .. })));

        tokio::time::advance(Duration::from_secs(1)).await;
        succeed(&breaker).await.expect("trial admitted");
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_failure_reopens_with_fresh_timer() {
        let breaker = breaker();
        for _ in 0..3 {
            fail(&breaker).await;
        }

        tokio::time::advance(Duration::from_secs(60)).await;
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(30)).await;
        match succeed(&breaker).await {
            Err(CircuitError::Open { retry_after, .. }) => {
                assert_eq!(retry_after, Duration::from_secs(30));
            }
            other => panic!("expected open circuit, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_trial_while_half_open() {
        let breaker = Arc::new(breaker());
        for _ in 0..3 {
            fail(&breaker).await;
        }
        tokio::time::advance(Duration::from_secs(60)).await;

        let (release, gate) = tokio::sync::oneshot::channel::<()>();
        let trial_breaker = breaker.clone();
        let trial = tokio::spawn(async move {
            trial_breaker
                .call(|| async move {
                    let _ = gate.await;
                    Ok::<_, Boom>(())
                })
                .await
        });
        tokio::task::yield_now().await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        assert!(matches!(succeed(&breaker).await, Err(CircuitError::Open { .. })));

        let _ = release.send(());
        trial.await.expect("trial task").expect("trial succeeds");
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_trial_counts_as_failure() {
        let breaker = breaker();
        for _ in 0..3 {
            fail(&breaker).await;
        }
        tokio::time::advance(Duration::from_secs(60)).await;

        let cancelled = tokio::time::timeout(
            Duration::from_secs(1),
            breaker.call(|| std::future::pending::<Result<(), Boom>>()),
        )
        .await;
        assert!(cancelled.is_err());
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(matches!(succeed(&breaker).await, Err(CircuitError::Open { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset() {
        let breaker = breaker();
        for _ in 0..3 {
            fail(&breaker).await;
        }
        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
        succeed(&breaker).await.expect("reset circuit admits calls");
    }
}
