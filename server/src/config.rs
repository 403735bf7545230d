//! Server Configuration
//!
//! Loads configuration from environment variables.

use std::env;

/// Minimum per-attempt timeout for outbound pushes, in seconds.
pub const MIN_POST_TIMEOUT_SECS: u64 = 5;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:5700")
    pub bind_address: String,

    /// Shared access token; `None` disables the auth gate
    pub access_token: Option<String>,

    /// Maximum request body size in bytes (default: 10MB)
    pub max_body_size: usize,

    /// Event collector URL; `None` disables outbound pushes
    pub post_url: Option<String>,

    /// HMAC secret for signing pushed events (optional)
    pub post_secret: Option<String>,

    /// Per-attempt push timeout in seconds (default and minimum: 5)
    pub post_timeout: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5700".into()),
            access_token: non_empty_var("ACCESS_TOKEN"),
            max_body_size: env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10 * 1024 * 1024), // 10MB
            post_url: non_empty_var("POST_URL"),
            post_secret: non_empty_var("POST_SECRET"),
            post_timeout: env::var("POST_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MIN_POST_TIMEOUT_SECS)
                .max(MIN_POST_TIMEOUT_SECS),
        }
    }

    /// Check if the auth gate is enabled.
    #[must_use]
    pub const fn has_auth(&self) -> bool {
        self.access_token.is_some()
    }

    /// Check if an event collector is configured.
    #[must_use]
    pub const fn has_push_target(&self) -> bool {
        self.post_url.is_some()
    }

    /// Create a default configuration for testing.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            access_token: None,
            max_body_size: 1024 * 1024,
            post_url: None,
            post_secret: None,
            post_timeout: MIN_POST_TIMEOUT_SECS,
        }
    }
}

/// Read an environment variable, treating an empty value as unset.
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
