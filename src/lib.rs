//! speak-core: a streaming text-to-speech playback core for an
//! editor-integrated reading system.
//!
//! The crate is organized around the component design of the spec this was
//! built from (see `DESIGN.md` for the grounding of each piece):
//!
//! - [`chunk`] — chunking (C1), the edit remapper (C2), and text cleaning.
//! - [`cache`] — content-addressed audio cache (C3).
//! - [`loader`] — the chunk loader, deduplicating and scheduling synthesis (C4).
//! - [`sink`] — the audio output device contract (C5).
//! - [`switcher`] — the per-session state machine driving the sink (C6).
//! - [`session`] — the public playback handle (C7).
//! - [`store`] — the top-level single-session owner (C8).
//! - [`bridge`] — the editor projection and edit-forwarding layer (C9).
//! - [`provider`] — synthesis backend trait, registry, and retry policy.
//! - [`settings`] — persisted configuration.
//! - [`voice`] — voice options, voice hashing, cache keys.
//! - [`cancellable`] — a cancellable-wait primitive for internal tasks.
//! - [`error`] — the unified error type.

pub mod bridge;
pub mod cache;
pub mod cancellable;
pub mod chunk;
pub mod error;
pub mod http;
pub mod loader;
pub mod provider;
pub mod session;
pub mod settings;
pub mod sink;
pub mod store;
pub mod switcher;
pub mod verbose;
pub mod voice;

pub use bridge::{EditorHandle, ReactiveBridge, ViewState};
pub use cache::{AudioCache, CacheError, InMemoryAudioCache};
pub use cancellable::cancellable;
pub use chunk::{AudioText, Chunk, ChunkMode, DecodedAudio, Edit, EditKind, FailureInfo, NoopCleaner, TextCleaner};
pub use error::{Result, SpeakError};
pub use http::{get_http_client, is_http_client_ready, warmup_http_client};
pub use loader::{ChunkLoader, ChunkLoaderConfig, ReaderId};
pub use provider::{registry, SynthesisBackend, SynthesisError, SynthesisRequest, SynthesisResult};
pub use session::{ActiveSession, Position};
pub use settings::Settings;
pub use sink::{AudioSink, SimulatedAudioSink, SinkError, TrackStatus};
pub use store::Store;
pub use switcher::ChunkSwitcher;
pub use verbose::set_verbose;
pub use voice::{CacheKey, VoiceHash, VoiceOptions};
