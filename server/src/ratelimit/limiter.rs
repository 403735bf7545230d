//! In-process token bucket consulted before every action dispatch.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::ratelimit::RateLimitConfig;

/// A gate shared by all concurrent requests.
///
/// `admit` either resolves to `true` (possibly after waiting) or rejects the
/// caller with `false`.
pub trait RateLimit: Send + Sync {
    fn admit(&self) -> BoxFuture<'_, bool>;
}

/// Mutable bucket state; `tokens` goes negative while waiters hold reservations.
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with blocking reservations.
///
/// Tokens refill continuously at `frequency` per second up to `capacity`.
/// A caller finding the bucket empty reserves the next token and sleeps
/// until it is due, unless that wait exceeds `max_wait`.
pub struct TokenBucket {
    frequency: f64,
    capacity: f64,
    max_wait: Option<Duration>,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a full bucket from configuration.
    ///
    /// A frequency that is not a positive finite number falls back to the
    /// default of one token per second.
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = f64::from(config.bucket.max(1));
        let frequency = if config.frequency.is_finite() && config.frequency > 0.0 {
            config.frequency
        } else {
            let fallback = RateLimitConfig::default().frequency;
            warn!(
                frequency = config.frequency,
                fallback, "Invalid rate limit frequency, using default"
            );
            fallback
        };
        Self {
            frequency,
            capacity,
            max_wait: config.max_wait,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Takes one token, waiting for it if necessary.
    ///
    /// Returns `false` without consuming anything if the wait would exceed
    /// `max_wait`.
    pub async fn acquire(&self) -> bool {
        let wait = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
            state.tokens = elapsed.mul_add(self.frequency, state.tokens).min(self.capacity);
            state.last_refill = now;

            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                return true;
            }

            let wait = Duration::from_secs_f64((1.0 - state.tokens) / self.frequency);
            if self.max_wait.is_some_and(|max| wait > max) {
                debug!(wait_ms = wait.as_millis() as u64, "Rate limit wait exceeds maximum, rejecting");
                return false;
            }
            state.tokens -= 1.0;
            wait
        };

        debug!(wait_ms = wait.as_millis() as u64, "Waiting for rate limit token");
        tokio::time::sleep(wait).await;
        true
    }
}

impl RateLimit for TokenBucket {
    fn admit(&self) -> BoxFuture<'_, bool> {
        Box::pin(self.acquire())
    }
}
