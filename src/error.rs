//! Unified error types for speak-core
//!
//! # Error Hierarchy
//!
//! ```text
//! SpeakError
//!   ├── Synthesis(SynthesisError)   - Provider HTTP/classification errors
//!   ├── Cache(CacheError)           - Audio cache read/write failures
//!   ├── Sink(SinkError)             - Audio output device failures
//!   ├── Config(String)              - Configuration errors
//!   ├── Settings(String)            - Settings load/save errors
//!   └── Io(std::io::Error)          - Generic I/O errors
//! ```
//!
//! New code returns `SpeakError` at public boundaries. Internal
//! orchestration code (loader background tasks, switcher reactions) is free
//! to use `anyhow::Error` for cheap propagation and convert at the edge.

pub use crate::cache::CacheError;
pub use crate::provider::error::SynthesisError;
pub use crate::sink::SinkError;

/// Top-level error type for speak-core operations.
#[derive(Debug, thiserror::Error)]
pub enum SpeakError {
    /// Speech synthesis failed (network, auth, malformed request).
    #[error("synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    /// The audio cache could not be read or written.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// The audio output device rejected an operation.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Configuration errors (malformed voice options, bad chunking config).
    #[error("configuration error: {0}")]
    Config(String),

    /// Settings load/save errors.
    #[error("settings error: {0}")]
    Settings(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error, for adapting `anyhow`-based internals at a boundary.
    #[error("{0}")]
    Other(String),
}

impl SpeakError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a settings error.
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Convenience result type using `SpeakError`.
pub type Result<T> = std::result::Result<T, SpeakError>;

impl From<anyhow::Error> for SpeakError {
    fn from(err: anyhow::Error) -> Self {
        SpeakError::Other(err.to_string())
    }
}
