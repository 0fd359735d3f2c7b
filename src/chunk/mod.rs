//! Chunk model (C1) and the text that owns a sequence of chunks (C7's
//! backing store), per §3 DATA MODEL.

mod clean;
mod edit;
mod split;

pub use clean::{NoopCleaner, TextCleaner};
pub use edit::{apply_edits, Edit, EditKind};
pub use split::{split_chunks, ChunkMode};

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Decoded PCM samples for visualization. Opaque to the core; produced by
/// the audio sink's `getAudioBuffer` (§4.5), never by this crate.
pub type DecodedAudio = Arc<[f32]>;

/// Diagnostic detail attached to a chunk whose synthesis failed (§7).
#[derive(Debug, Clone)]
pub struct FailureInfo {
    /// Human-readable failure description.
    pub message: String,
    /// HTTP status code, if the failure came from a provider response.
    pub http_code: Option<u16>,
    /// Whether the loader considered this failure retryable.
    pub retryable: bool,
}

/// One speakable unit of source text (§3).
///
/// Mutated only by the edit remapper (C2, [`apply_edits`]) and by the chunk
/// loader (C4, load-state transitions). Everything else treats a `Chunk` as
/// read-only.
#[derive(Debug, Clone)]
pub struct Chunk {
    raw_text: String,
    cleaned_text: String,
    start: usize,
    end: usize,
    audio: Option<Vec<u8>>,
    audio_decoded: Option<DecodedAudio>,
    duration: Option<Duration>,
    loading: bool,
    failed: bool,
    failure_info: Option<FailureInfo>,
    retry_count: u32,
    last_failure_at: Option<Instant>,
}

impl Chunk {
    /// Construct a chunk from a raw source span. `cleaned_text` is derived
    /// immediately via `cleaner`.
    pub fn new(raw_text: String, start: usize, cleaner: &dyn TextCleaner) -> Self {
        let end = start + raw_text.len();
        let cleaned_text = cleaner.clean(&raw_text);
        Self {
            raw_text,
            cleaned_text,
            start,
            end,
            audio: None,
            audio_decoded: None,
            duration: None,
            loading: false,
            failed: false,
            failure_info: None,
            retry_count: 0,
            last_failure_at: None,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn cleaned_text(&self) -> &str {
        &self.cleaned_text
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether the cleaned text is blank (only whitespace, or empty) — the
    /// switcher (C6) skips such chunks rather than synthesizing silence.
    pub fn is_blank(&self) -> bool {
        self.cleaned_text.trim().is_empty()
    }

    pub fn audio(&self) -> Option<&[u8]> {
        self.audio.as_deref()
    }

    pub fn audio_decoded(&self) -> Option<&DecodedAudio> {
        self.audio_decoded.as_ref()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn failure_info(&self) -> Option<&FailureInfo> {
        self.failure_info.as_ref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_failure_at(&self) -> Option<Instant> {
        self.last_failure_at
    }

    /// Mark this chunk as awaiting synthesis (C4/C6).
    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Attach successfully synthesized audio, clearing any prior failure.
    pub fn attach_audio(&mut self, bytes: Vec<u8>, duration: Option<Duration>) {
        self.audio = Some(bytes);
        self.duration = duration;
        self.loading = false;
        self.failed = false;
        self.failure_info = None;
    }

    /// Attach a decoded waveform for visualization (non-fatal if absent).
    pub fn attach_decoded(&mut self, decoded: DecodedAudio) {
        self.audio_decoded = Some(decoded);
    }

    /// Mark synthesis as failed.
    pub fn mark_failed(&mut self, info: FailureInfo) {
        self.loading = false;
        self.failed = true;
        self.retry_count += 1;
        self.last_failure_at = Some(Instant::now());
        self.failure_info = Some(info);
    }

    /// Clear failure state (e.g. user-initiated retry after cooldown).
    pub fn clear_failure(&mut self) {
        self.failed = false;
        self.failure_info = None;
    }

    /// Reset all load-derived state. Used when the cleaned text changes
    /// under an edit, and when a switcher tears down (§4.6 destroy).
    pub(crate) fn reset_audio_state(&mut self) {
        self.audio = None;
        self.audio_decoded = None;
        self.duration = None;
        self.loading = false;
        self.failed = false;
        self.failure_info = None;
    }

    /// Replace the raw text, recomputing `cleaned_text` and resetting
    /// audio-derived state *iff* the cleaned text actually changed (§4.2,
    /// §8: edits that do not alter cleaned text must preserve audio).
    pub(crate) fn set_raw_text(&mut self, raw_text: String, cleaner: &dyn TextCleaner) {
        let new_cleaned = cleaner.clean(&raw_text);
        let cleaned_changed = new_cleaned != self.cleaned_text;
        self.raw_text = raw_text;
        self.cleaned_text = new_cleaned;
        if cleaned_changed {
            self.reset_audio_state();
        }
    }

    pub(crate) fn set_span(&mut self, start: usize, end: usize) {
        self.start = start;
        self.end = end;
    }

    pub(crate) fn shift(&mut self, delta: i64) {
        self.start = (self.start as i64 + delta) as usize;
        self.end = (self.end as i64 + delta) as usize;
    }
}

/// An ordered sequence of chunks tiling a source text, plus identity and
/// display metadata (§3 AudioText).
#[derive(Debug, Clone)]
pub struct AudioText {
    pub id: String,
    pub filename: String,
    pub friendly_name: String,
    pub created_at: Instant,
    pub chunks: Vec<Chunk>,
}

impl AudioText {
    /// Build an `AudioText` by chunking `text` starting at document offset
    /// `start` (§4.1).
    pub fn from_text(
        id: impl Into<String>,
        filename: impl Into<String>,
        friendly_name: impl Into<String>,
        text: &str,
        start: usize,
        mode: ChunkMode,
        min_chunk_length: usize,
        cleaner: &dyn TextCleaner,
    ) -> Self {
        let spans = split_chunks(text, mode, min_chunk_length);
        let chunks = spans
            .into_iter()
            .map(|(local_start, local_end)| {
                let raw = text[local_start..local_end].to_string();
                Chunk::new(raw, start + local_start, cleaner)
            })
            .collect();
        Self {
            id: id.into(),
            filename: filename.into(),
            friendly_name: friendly_name.into(),
            created_at: Instant::now(),
            chunks,
        }
    }

    /// Validate the invariants of §3: sorted, contiguous, no gaps.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        for w in self.chunks.windows(2) {
            assert!(w[0].start <= w[0].end);
            assert_eq!(w[0].end, w[1].start, "chunks must be contiguous");
        }
        if let Some(last) = self.chunks.last() {
            assert!(last.start <= last.end);
        }
    }
}
