//! Persisted settings (§6 "Settings (recognized options)").
//!
//! Flat, file-backed, following the simpler of the two settings shapes this
//! crate inherited: one struct, one JSON file, no nested stores. Any field
//! listed here as voice-affecting contributes to
//! [`Settings::voice_options`]/[`VoiceHash`](crate::voice::VoiceHash).

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::chunk::ChunkMode;
use crate::voice::VoiceOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Registered synthesis provider name (`modelProvider`).
    #[serde(default = "default_model_provider")]
    pub model_provider: String,
    /// Model identifier passed to the provider.
    #[serde(default = "default_model")]
    pub model: String,
    /// Voice identifier passed to the provider (`ttsVoice`).
    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,
    /// Optional free-form synthesis instructions (tone, style).
    #[serde(default)]
    pub instructions: Option<String>,
    /// Provider API base URI override.
    #[serde(default)]
    pub api_uri: Option<String>,
    /// Provider API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Playback rate multiplier.
    #[serde(default = "default_playback_speed")]
    pub playback_speed: f32,
    /// Chunking granularity (§4.1).
    #[serde(default)]
    pub chunk_type: ChunkMode,
    /// Audio cache entry TTL, in milliseconds.
    #[serde(default = "default_cache_duration_millis")]
    pub cache_duration_millis: u64,
    /// Whether the bridge autoscrolls the playing editor into view.
    #[serde(default = "default_autoscroll")]
    pub auto_scroll_player_view: bool,
    /// Background cache-expiry tick base, in milliseconds (§4.8).
    #[serde(default = "default_background_loader_interval_millis")]
    pub background_loader_interval_millis: u64,
    /// Minimum chunk length passed to the splitter (§4.1).
    #[serde(default)]
    pub min_chunk_length: usize,
}

fn default_model_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "tts-1".to_string()
}

fn default_tts_voice() -> String {
    "shimmer".to_string()
}

fn default_playback_speed() -> f32 {
    1.0
}

fn default_cache_duration_millis() -> u64 {
    7 * 24 * 60 * 60 * 1000
}

fn default_autoscroll() -> bool {
    true
}

fn default_background_loader_interval_millis() -> u64 {
    1000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_provider: default_model_provider(),
            model: default_model(),
            tts_voice: default_tts_voice(),
            instructions: None,
            api_uri: None,
            api_key: None,
            playback_speed: default_playback_speed(),
            chunk_type: ChunkMode::default(),
            cache_duration_millis: default_cache_duration_millis(),
            auto_scroll_player_view: default_autoscroll(),
            background_loader_interval_millis: default_background_loader_interval_millis(),
            min_chunk_length: 0,
        }
    }
}

impl Settings {
    /// Settings file path (`~/.config/speak-core/settings.json`).
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("speak-core")
            .join("settings.json")
    }

    /// Synthesis-affecting options derived from these settings, for
    /// `VoiceHash` and for handing to the provider adapter.
    pub fn voice_options(&self) -> VoiceOptions {
        let mut options = VoiceOptions::new(&self.model_provider, &self.model, &self.tts_voice);
        options.instructions = self.instructions.clone();
        options.api_uri = self.api_uri.clone();
        options.api_key = self.api_key.clone();
        options
    }

    /// Load settings from disk, falling back to defaults if the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        let path = Self::path();
        if let Ok(content) = fs::read_to_string(&path)
            && let Ok(settings) = serde_json::from_str(&content)
        {
            return settings;
        }
        Self::default()
    }

    /// Save settings to disk with 0600 permissions on Unix.
    ///
    /// The file is created with that mode from the start to avoid a race
    /// where it is briefly world-readable.
    pub fn save(&self) -> Result<()> {
        use std::io::Write;

        let path = Self::path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)?;
            file.write_all(content.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&path, &content)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let restored: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.model_provider, settings.model_provider);
        assert_eq!(restored.tts_voice, settings.tts_voice);
    }

    #[test]
    fn voice_options_carry_synthesis_affecting_fields() {
        let mut settings = Settings::default();
        settings.tts_voice = "onyx".to_string();
        settings.api_key = Some("sk-test".to_string());
        let options = settings.voice_options();
        assert_eq!(options.voice, "onyx");
        assert_eq!(options.api_key.as_deref(), Some("sk-test"));
    }
}
