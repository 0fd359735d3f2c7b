//! Synthesis provider error types.

use std::fmt;

/// Errors that can occur while requesting synthesized audio from a
/// provider, per EXTERNAL INTERFACES §6: HTTP ≥300 responses map into this
/// typed error carrying `status`, `http_code`, and the provider body.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SynthesisError {
    /// The provider rejected the request with an HTTP error response.
    #[error("synthesis request failed ({status}): {body}")]
    Http {
        /// `true` if this status should be retried with backoff.
        status: ErrorStatus,
        /// Raw HTTP status code.
        http_code: u16,
        /// Provider-specific response body (diagnostic only).
        body: String,
    },

    /// A transport-level failure (timeout, connection reset) occurred
    /// before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider returned a response that could not be parsed.
    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),

    /// No provider is registered under the requested name.
    #[error("unknown synthesis provider: {0}")]
    UnknownProvider(String),
}

/// Coarse classification of an HTTP failure, independent of the exact code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    /// Timeout, 429, or ≥500 — safe to retry with backoff.
    Retryable,
    /// Auth, quota, or malformed request — retrying will not help.
    Permanent,
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorStatus::Retryable => write!(f, "retryable"),
            ErrorStatus::Permanent => write!(f, "permanent"),
        }
    }
}

impl SynthesisError {
    /// Build an HTTP error from a status code and response body.
    pub fn http(http_code: u16, body: impl Into<String>) -> Self {
        let status = reqwest::StatusCode::from_u16(http_code)
            .map(|s| {
                if super::retry::is_retryable_status(s) {
                    ErrorStatus::Retryable
                } else {
                    ErrorStatus::Permanent
                }
            })
            .unwrap_or(ErrorStatus::Retryable);
        Self::Http {
            status,
            http_code,
            body: body.into(),
        }
    }

    /// Whether the chunk loader (§4.4/§7) should retry this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            SynthesisError::Http { status, .. } => *status == ErrorStatus::Retryable,
            SynthesisError::Transport(_) => true,
            SynthesisError::InvalidResponse(_) | SynthesisError::UnknownProvider(_) => false,
        }
    }
}

impl From<reqwest::Error> for SynthesisError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::http(status.as_u16(), err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
