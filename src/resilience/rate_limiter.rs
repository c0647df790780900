//! Token-bucket rate limiting for outbound gateway calls.
//!
//! The bucket starts full and refills continuously at `capacity / window`
//! tokens per second. A request either takes a token immediately or is
//! refused; callers are never queued.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    refill_rate_per_sec: f64,
    /// `None` until the first acquisition
    last_refill: Option<Instant>,
}

impl TokenBucket {
    fn new(capacity: u32, window: Duration) -> Self {
        let window_secs = window.as_secs_f64().max(f64::MIN_POSITIVE);
        Self {
            tokens: capacity as f64,
            max_tokens: capacity as f64,
            refill_rate_per_sec: capacity as f64 / window_secs,
            last_refill: None,
        }
    }

    fn refill(&mut self, now: Instant) {
        if let Some(last) = self.last_refill {
            let elapsed = now.saturating_duration_since(last).as_secs_f64();
            self.tokens = (self.tokens + elapsed * self.refill_rate_per_sec).min(self.max_tokens);
        }
        self.last_refill = Some(now);
    }

    fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Process-wide limiter shared by every request on one client.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    capacity: u32,
    window: Duration,
}

impl RateLimiter {
    /// Allow at most `capacity` requests per `window` on average.
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self { bucket: Mutex::new(TokenBucket::new(capacity, window)), capacity, window }
    }

    /// Take one token if available. Refill and consumption happen under a
    /// single lock, so concurrent callers can never overdraw the bucket.
    pub fn acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let granted = bucket.try_consume(Instant::now());

        if granted {
            debug!(remaining_tokens = bucket.tokens as u32, "Rate limit check passed");
        } else {
            warn!(
                capacity = self.capacity,
                window_secs = self.window.as_secs(),
                "Rate limit exceeded"
            );
        }

        granted
    }

    /// Tokens currently available, after refilling for elapsed time.
    pub fn available_tokens(&self) -> f64 {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.refill(Instant::now());
        bucket.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
