//! Push Types
//!
//! Target, retry schedule and per-event delivery state for outbound pushes.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::config::MIN_POST_TIMEOUT_SECS;

/// Total delivery attempts per event.
pub const MAX_ATTEMPTS: u32 = 5;

/// Wait before the first retry.
pub const BASE_RETRY_WAIT: Duration = Duration::from_millis(500);

/// Upper bound for any single retry wait.
pub const MAX_RETRY_WAIT: Duration = Duration::from_millis(5000);

/// User agent sent with every push.
pub const USER_AGENT: &str = "CQHttp/4.15.0";

/// Destination and credentials for outbound event delivery.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct PushTarget {
    pub url: String,
    pub secret: Option<String>,
    pub timeout: Duration,
}

impl PushTarget {
    /// Create a target, applying the timeout floor and ignoring an empty secret.
    pub fn new(url: impl Into<String>, secret: Option<String>, timeout_secs: u64) -> Self {
        Self {
            url: url.into(),
            secret: secret.filter(|s| !s.is_empty()),
            timeout: Duration::from_secs(timeout_secs.max(MIN_POST_TIMEOUT_SECS)),
        }
    }
}

/// Exponential backoff schedule for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_wait: BASE_RETRY_WAIT,
            max_wait: MAX_RETRY_WAIT,
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_wait.saturating_mul(factor).min(self.max_wait)
    }
}

/// Delivery state machine for a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Sending { attempt: u32 },
    Retrying { attempt: u32, wait: Duration },
    Delivered { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl DeliveryState {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered { .. } | Self::Exhausted { .. })
    }
}

/// Final result of pushing one event.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// The collector accepted the event; `feedback` is its JSON reply, if any.
    Delivered {
        attempts: u32,
        feedback: Option<Value>,
    },
    /// Every attempt failed; the event was dropped.
    Exhausted { attempts: u32, last_error: PushError },
}

impl DeliveryOutcome {
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Failure of a single delivery attempt.
#[derive(Error, Debug)]
pub enum PushError {
    #[error("Request timed out")]
    Timeout,
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Collector answered HTTP {0}")]
    Status(StatusCode),
    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}
