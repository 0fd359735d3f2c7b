//! Voice options, voice hashing, and cache keys (§3 DATA MODEL).
//!
//! `VoiceHash` is a deterministic fingerprint of every option that affects
//! synthesized audio. `CacheKey` combines it with a chunk's cleaned text so
//! two chunks with identical text and voice options share cached audio.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Synthesis-affecting options, carried end to end from `Settings` down to
/// the provider adapter (EXTERNAL INTERFACES §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceOptions {
    /// Name of the registered synthesis provider (`modelProvider`).
    pub provider: String,
    /// Model identifier passed to the provider.
    pub model: String,
    /// Voice identifier passed to the provider.
    pub voice: String,
    /// Optional free-form instructions (tone, style).
    #[serde(default)]
    pub instructions: Option<String>,
    /// Provider API base URI, when overridden from the default.
    #[serde(default)]
    pub api_uri: Option<String>,
    /// API key identity. Only the *identity* of the key participates in the
    /// hash (§3): we hash the key material itself, never store or log it.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Provider-specific extra parameters not otherwise modeled.
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
}

impl VoiceOptions {
    /// Construct minimal options for a provider/model/voice triple.
    pub fn new(provider: impl Into<String>, model: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            voice: voice.into(),
            instructions: None,
            api_uri: None,
            api_key: None,
            extras: BTreeMap::new(),
        }
    }
}

/// Deterministic fingerprint of a [`VoiceOptions`] value (§3).
///
/// Any option change that alters synthesized audio must change this hash;
/// conversely, two `VoiceOptions` that would synthesize byte-identical
/// audio should hash identically so they can share cached audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoiceHash(u64);

impl VoiceHash {
    /// Compute the hash for a set of voice options.
    pub fn compute(options: &VoiceOptions) -> Self {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        options.provider.hash(&mut hasher);
        options.model.hash(&mut hasher);
        options.voice.hash(&mut hasher);
        options.instructions.hash(&mut hasher);
        options.api_uri.hash(&mut hasher);
        options.api_key.hash(&mut hasher);
        for (k, v) in &options.extras {
            k.hash(&mut hasher);
            v.hash(&mut hasher);
        }
        Self(hasher.finish())
    }

    /// Raw 64-bit value, for use as a map key or log field.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for VoiceHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Content-addressed cache partition key: `hash(voice_hash ++ cleaned_text)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(u64);

impl CacheKey {
    /// Compute the cache key for a chunk's cleaned text under a voice.
    pub fn compute(voice_hash: VoiceHash, cleaned_text: &str) -> Self {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        voice_hash.0.hash(&mut hasher);
        cleaned_text.hash(&mut hasher);
        Self(hasher.finish())
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_options_hash_identically() {
        let a = VoiceOptions::new("openai", "tts-1", "shimmer");
        let b = VoiceOptions::new("openai", "tts-1", "shimmer");
        assert_eq!(VoiceHash::compute(&a), VoiceHash::compute(&b));
    }

    #[test]
    fn voice_change_changes_hash() {
        let shimmer = VoiceOptions::new("openai", "tts-1", "shimmer");
        let onyx = VoiceOptions::new("openai", "tts-1", "onyx");
        assert_ne!(VoiceHash::compute(&shimmer), VoiceHash::compute(&onyx));
    }

    #[test]
    fn cache_key_depends_on_text_and_voice() {
        let voice = VoiceHash::compute(&VoiceOptions::new("openai", "tts-1", "shimmer"));
        let other_voice = VoiceHash::compute(&VoiceOptions::new("openai", "tts-1", "onyx"));
        assert_eq!(CacheKey::compute(voice, "hello"), CacheKey::compute(voice, "hello"));
        assert_ne!(CacheKey::compute(voice, "hello"), CacheKey::compute(voice, "world"));
        assert_ne!(CacheKey::compute(voice, "hello"), CacheKey::compute(other_voice, "hello"));
    }
}
