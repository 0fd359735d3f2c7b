//! Active session (C7, §4.7): the public playback handle for one piece of
//! text. Owns the chunk list, the current position, and the switcher that
//! drives them through a sink.

use std::ops::Range;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};

use crate::chunk::{AudioText, Chunk, FailureInfo, TextCleaner};
use crate::loader::ChunkLoader;
use crate::sink::AudioSink;
use crate::switcher::ChunkSwitcher;
use crate::voice::{VoiceHash, VoiceOptions};

/// Where playback currently stands in the chunk list. `-1` in the spec's
/// JS-flavored integer encoding becomes the explicit `Completed` variant
/// here — idiomatic Rust prefers a sum type to a magic sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    At(usize),
    Completed,
}

impl Position {
    pub fn index(self) -> Option<usize> {
        match self {
            Position::At(i) => Some(i),
            Position::Completed => None,
        }
    }
}

pub(crate) fn next_position(pos: Position, len: usize) -> Position {
    match pos {
        Position::Completed => Position::Completed,
        Position::At(i) => {
            let n = i + 1;
            if n >= len {
                Position::Completed
            } else {
                Position::At(n)
            }
        }
    }
}

pub(crate) fn previous_position(pos: Position, len: usize) -> Position {
    match pos {
        Position::Completed => {
            if len == 0 {
                Position::Completed
            } else {
                Position::At(len - 1)
            }
        }
        Position::At(i) => Position::At(i.saturating_sub(1)),
    }
}

/// One piece of text being read aloud, plus the machinery driving its
/// audio. At most one `ActiveSession` is live per [`crate::store::Store`]
/// slot (§4.8).
pub struct ActiveSession {
    chunks: Arc<Mutex<Vec<Chunk>>>,
    position_tx: watch::Sender<Position>,
    position_rx: watch::Receiver<Position>,
    voice_options: Mutex<VoiceOptions>,
    sink: Arc<dyn AudioSink>,
    loader: Arc<ChunkLoader>,
    cleaner: Arc<dyn TextCleaner>,
    switcher: RwLock<ChunkSwitcher>,
}

impl ActiveSession {
    pub async fn new(
        audio_text: AudioText,
        voice_options: VoiceOptions,
        sink: Arc<dyn AudioSink>,
        loader: Arc<ChunkLoader>,
        cleaner: Arc<dyn TextCleaner>,
    ) -> Self {
        let initial_position = if audio_text.chunks.is_empty() {
            Position::Completed
        } else {
            Position::At(0)
        };
        let (position_tx, position_rx) = watch::channel(initial_position);
        let chunks = Arc::new(Mutex::new(audio_text.chunks));

        let switcher = ChunkSwitcher::new(
            Arc::clone(&chunks),
            position_tx.clone(),
            voice_options.clone(),
            Arc::clone(&sink),
            Arc::clone(&loader),
        );

        Self {
            chunks,
            position_tx,
            position_rx,
            voice_options: Mutex::new(voice_options),
            sink,
            loader,
            cleaner,
            switcher: RwLock::new(switcher),
        }
    }

    pub fn play(&self) {
        self.sink.play();
    }

    pub fn pause(&self) {
        self.sink.pause();
    }

    pub fn position(&self) -> Position {
        *self.position_rx.borrow()
    }

    pub async fn is_playing(&self) -> bool {
        self.switcher.read().await.is_playing()
    }

    /// Derived from the active chunk's transient state, per §4.7.
    pub async fn is_loading(&self) -> bool {
        let Some(idx) = self.position().index() else {
            return false;
        };
        self.chunks
            .lock()
            .await
            .get(idx)
            .map(Chunk::is_loading)
            .unwrap_or(false)
    }

    /// Derived from the active chunk's transient state, per §4.7.
    pub async fn error(&self) -> Option<FailureInfo> {
        let idx = self.position().index()?;
        self.chunks.lock().await.get(idx)?.failure_info().cloned()
    }

    pub async fn go_to_next(&self) {
        let len = self.chunks.lock().await.len();
        let next = next_position(self.position(), len);
        let _ = self.position_tx.send(next);
    }

    pub async fn go_to_previous(&self) {
        let len = self.chunks.lock().await.len();
        let prev = previous_position(self.position(), len);
        let _ = self.position_tx.send(prev);
    }

    /// Apply a batch of edits to the chunk list (§4.2/§4.9). No other
    /// reaction is triggered here — the switcher's next natural activation
    /// notices an invalidated current chunk and reloads it.
    pub async fn on_multi_text_changed(&self, edits: &[crate::chunk::Edit]) {
        let mut guard = self.chunks.lock().await;
        crate::chunk::apply_edits(edits, &mut guard, &*self.cleaner);
    }

    pub async fn on_text_changed(&self, edit: crate::chunk::Edit) {
        self.on_multi_text_changed(std::slice::from_ref(&edit)).await;
    }

    /// Tear down and rebuild the switcher at the same position when the
    /// effective voice changes (§4.7 "On voice or rate change").
    pub async fn set_voice_options(&self, options: VoiceOptions) {
        let changed = {
            let mut current = self.voice_options.lock().await;
            let changed = VoiceHash::compute(&current) != VoiceHash::compute(&options);
            *current = options.clone();
            changed
        };
        if !changed {
            return;
        }

        let mut switcher_guard = self.switcher.write().await;
        switcher_guard.destroy().await;
        *switcher_guard = ChunkSwitcher::new(
            Arc::clone(&self.chunks),
            self.position_tx.clone(),
            options,
            Arc::clone(&self.sink),
            Arc::clone(&self.loader),
        );
    }

    pub fn set_rate(&self, rate: f32) {
        self.sink.set_rate(rate);
    }

    pub async fn destroy(&self) {
        self.switcher.write().await.destroy().await;
    }

    /// Byte ranges for the bridge's three decoration classes (§4.9):
    /// `(playing-before, playing-now, playing-after)`. `None` once playback
    /// has completed or the text is empty.
    pub async fn view_ranges(&self) -> Option<(Range<usize>, Range<usize>, Range<usize>)> {
        let idx = self.position().index()?;
        let guard = self.chunks.lock().await;
        let first_start = guard.first()?.start();
        let last_end = guard.last()?.end();
        let current = guard.get(idx)?;
        Some((
            first_start..current.start(),
            current.start()..current.end(),
            current.end()..last_end,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_position_advances_then_completes() {
        assert_eq!(next_position(Position::At(0), 2), Position::At(1));
        assert_eq!(next_position(Position::At(1), 2), Position::Completed);
        assert_eq!(next_position(Position::Completed, 2), Position::Completed);
    }

    #[test]
    fn previous_position_retreats_or_wraps_from_completed() {
        assert_eq!(previous_position(Position::At(1), 3), Position::At(0));
        assert_eq!(previous_position(Position::At(0), 3), Position::At(0));
        assert_eq!(previous_position(Position::Completed, 3), Position::At(2));
        assert_eq!(previous_position(Position::Completed, 0), Position::Completed);
    }
}
