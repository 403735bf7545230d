//! Rate limiting configuration.

use std::time::Duration;

/// Configuration for the dispatch rate limiter.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    pub enabled: bool,
    /// Tokens added per second
    pub frequency: f64,
    /// Maximum number of stored tokens (burst size)
    pub bucket: u32,
    /// Longest a caller may wait for a token; `None` waits indefinitely
    pub max_wait: Option<Duration>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency: 1.0,
            bucket: 1,
            max_wait: None,
        }
    }
}

impl RateLimitConfig {
    /// Creates configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RATE_LIMIT_ENABLED`: Enable/disable rate limiting (default: false)
    /// - `RATE_LIMIT_FREQUENCY`: Tokens per second (default: 1.0)
    /// - `RATE_LIMIT_BUCKET`: Burst size (default: 1)
    /// - `RATE_LIMIT_MAX_WAIT_MS`: Reject callers that would wait longer (default: unset)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RATE_LIMIT_ENABLED") {
            config.enabled = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_FREQUENCY") {
            if let Some(frequency) = parse_frequency(&val) {
                config.frequency = frequency;
            }
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_BUCKET") {
            if let Some(bucket) = val.trim().parse().ok().filter(|b: &u32| *b > 0) {
                config.bucket = bucket;
            }
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_MAX_WAIT_MS") {
            config.max_wait = val.trim().parse().ok().map(Duration::from_millis);
        }

        config
    }
}

/// Parses a positive, finite token frequency.
fn parse_frequency(val: &str) -> Option<f64> {
    val.trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && *f > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(!config.enabled);
        assert!((config.frequency - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.bucket, 1);
        assert!(config.max_wait.is_none());
    }

    #[test]
    fn test_parse_frequency() {
        assert_eq!(parse_frequency("2.5"), Some(2.5));
        assert_eq!(parse_frequency(" 10 "), Some(10.0));

        // Invalid values
        assert!(parse_frequency("0").is_none());
        assert!(parse_frequency("-1").is_none());
        assert!(parse_frequency("inf").is_none());
        assert!(parse_frequency("fast").is_none());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("RATE_LIMIT_ENABLED", "true");
        std::env::set_var("RATE_LIMIT_FREQUENCY", "4");
        std::env::set_var("RATE_LIMIT_BUCKET", "0");
        std::env::set_var("RATE_LIMIT_MAX_WAIT_MS", "250");

        let config = RateLimitConfig::from_env();
        assert!(config.enabled);
        assert!((config.frequency - 4.0).abs() < f64::EPSILON);
        // Zero bucket is ignored
        assert_eq!(config.bucket, 1);
        assert_eq!(config.max_wait, Some(Duration::from_millis(250)));

        for key in [
            "RATE_LIMIT_ENABLED",
            "RATE_LIMIT_FREQUENCY",
            "RATE_LIMIT_BUCKET",
            "RATE_LIMIT_MAX_WAIT_MS",
        ] {
            std::env::remove_var(key);
        }
    }
}
