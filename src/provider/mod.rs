//! Synthesis provider module (§3 VoiceHash, §4.4 Chunk loader, §6 EXTERNAL
//! INTERFACES).
//!
//! Synthesis provider HTTP clients are nominally out of scope for this
//! crate — the spec only asks for the `(text, options) -> Future<bytes>`
//! boundary. This module defines that boundary as the [`SynthesisBackend`]
//! trait, a small [`ProviderRegistry`] for looking backends up by name, and
//! one worked reference implementation (`openai`) so the trait has at least
//! one concrete, testable instance. Production embedders are expected to
//! register their own backends; the registry is not required by the spec
//! but mirrors the architecture pattern the teacher crate uses for its own
//! (transcription) provider registry.
//!
//! ```text
//! Provider System
//!   ├── Registry   - lookup by name (`registry()`)
//!   ├── retry      - exponential backoff / retryable-status classification
//!   ├── error      - SynthesisError, typed HTTP failures
//!   └── openai     - reference HTTP backend
//! ```

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

pub mod error;
pub mod openai;
pub mod retry;

pub use error::SynthesisError;

use crate::voice::VoiceOptions;

/// Default timeout for synthesis requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// A request to synthesize a chunk of cleaned text into audio.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// The cleaned text to synthesize (never raw/markup text, §4.1).
    pub text: String,
    /// Voice/model options affecting the output (§3 VoiceHash).
    pub options: VoiceOptions,
}

/// The result of a successful synthesis call.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    /// Opaque audio bytes (typically MP3); format is not interpreted here.
    pub audio: Vec<u8>,
}

/// Trait for speech synthesis providers.
///
/// Implementations must map HTTP ≥300 responses into [`SynthesisError::Http`]
/// and must not panic on provider-side failures.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Unique identifier for this provider (e.g. `"openai"`).
    fn name(&self) -> &'static str;

    /// Human-readable name for diagnostics/UI.
    fn display_name(&self) -> &'static str;

    /// Synthesize `request.text` under `request.options`, returning audio
    /// bytes or a typed [`SynthesisError`].
    async fn synthesize(
        &self,
        client: &reqwest::Client,
        request: &SynthesisRequest,
    ) -> Result<SynthesisResult, SynthesisError>;
}

/// Registry of available synthesis providers, keyed by name.
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn SynthesisBackend>>,
}

impl ProviderRegistry {
    /// Build a registry containing the built-in reference providers.
    pub fn new() -> Self {
        let mut providers: HashMap<&'static str, Arc<dyn SynthesisBackend>> = HashMap::new();
        providers.insert("openai", Arc::new(openai::OpenAiTtsBackend));
        Self { providers }
    }

    /// Register (or replace) a provider under its own name.
    pub fn register(&mut self, backend: Arc<dyn SynthesisBackend>) {
        self.providers.insert(backend.name(), backend);
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn SynthesisBackend>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the process-wide provider registry.
///
/// The registry is seeded with the built-in reference providers on first
/// access; callers needing a custom provider set should not rely on this
/// global and should construct their own `ProviderRegistry` instead.
pub fn registry() -> &'static ProviderRegistry {
    static REGISTRY: OnceLock<ProviderRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ProviderRegistry::new)
}
