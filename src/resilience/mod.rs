//! # Resilience
//!
//! Rate limiting, circuit breaking and the opt-in retry policy used around
//! gateway calls.

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitError, CircuitState};
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
