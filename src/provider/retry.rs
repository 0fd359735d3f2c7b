//! Retry logic with exponential backoff for synthesis providers.
//!
//! Classifies transient failures (timeouts, 429, 5xx) so the chunk loader
//! (§4.4) can retry them with exponential backoff while non-retryable
//! failures (auth, malformed request) fail a chunk immediately.

use std::time::Duration;

use reqwest::StatusCode;

/// Maximum synthesis attempts per chunk slot, including the first try.
pub const MAX_ATTEMPTS: u32 = 3;

/// Per-chunk client-side cooldown after a slot fails (§4.4).
pub const COOLDOWN: Duration = Duration::from_secs(5);

/// Configuration for retry/backoff behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts within a slot.
    pub max_retries: u32,
    /// Base delay in milliseconds (doubles with each attempt).
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay for rate-limited (429) responses.
    pub rate_limit_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_ATTEMPTS,
            base_delay_ms: 250,
            max_delay_ms: COOLDOWN.as_millis() as u64,
            rate_limit_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate the delay before a given (0-based) retry attempt.
    pub fn delay_for_attempt(&self, attempt: u32, is_rate_limited: bool) -> Duration {
        let base_delay = self.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
        let delay_ms = base_delay.min(self.max_delay_ms);

        if is_rate_limited {
            Duration::from_millis((delay_ms as f64 * self.rate_limit_multiplier) as u64)
        } else {
            Duration::from_millis(delay_ms)
        }
    }
}

/// Check if an HTTP status code is retryable (timeout, 429, or ≥500).
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500
}

/// Check if a status code indicates rate limiting.
pub fn is_rate_limited(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
}

/// Check if a reqwest transport error is retryable.
pub fn is_retryable_transport_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_and_caps() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.delay_for_attempt(0, false), Duration::from_millis(250));
        assert_eq!(cfg.delay_for_attempt(1, false), Duration::from_millis(500));
        assert_eq!(cfg.delay_for_attempt(2, false), Duration::from_millis(1000));
        // attempt large enough to hit the cap
        assert_eq!(cfg.delay_for_attempt(10, false), Duration::from_millis(cfg.max_delay_ms));
    }

    #[test]
    fn rate_limit_multiplies_delay() {
        let cfg = RetryConfig::default();
        let base = cfg.delay_for_attempt(0, false);
        let limited = cfg.delay_for_attempt(0, true);
        assert_eq!(limited, base * 2);
    }

    #[test]
    fn retryable_status_classification() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }
}
