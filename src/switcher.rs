//! Chunk switcher (C6, §4.6): the per-session state machine that drives the
//! audio sink from one chunk to the next, reacting to sink signals and
//! position changes.
//!
//! Modeled as observable cells (`tokio::sync::watch`) plus one background
//! reactive task, per DESIGN NOTES §9 ("model chunks, positions, and sink
//! signals as observable cells; derivations ... recomputed only on
//! dependency change"). This is the Rust rendering of the spec's
//! single-threaded-cooperative model (§5): there is exactly one reactive
//! task per switcher, and all chunk mutation goes through the shared
//! `tokio::sync::Mutex`, so derivations still never observe a chunk list
//! mid-edit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::chunk::{Chunk, FailureInfo};
use crate::loader::{ChunkLoader, ReaderId};
use crate::session::{next_position, Position};
use crate::sink::{AudioSink, TrackStatus};
use crate::voice::VoiceOptions;
use crate::{verbose, warn};

/// How many upcoming non-blank chunks are speculatively preloaded (§4.6
/// `populateUpcoming`, GLOSSARY "Prefetch window").
const PREFETCH_WINDOW: usize = 3;

/// Drives one session's chunks through the sink. Construct via
/// [`ChunkSwitcher::new`]; call [`ChunkSwitcher::destroy`] exactly once when
/// done (it is not dropped automatically — the background task must be
/// told to stop).
pub struct ChunkSwitcher {
    reader_id: ReaderId,
    chunks: Arc<Mutex<Vec<Chunk>>>,
    is_playing_tx: watch::Sender<bool>,
    destroyed: Arc<AtomicBool>,
    driver: std::sync::Mutex<Option<JoinHandle<()>>>,
    loader: Arc<ChunkLoader>,
}

impl ChunkSwitcher {
    pub fn new(
        chunks: Arc<Mutex<Vec<Chunk>>>,
        position_tx: watch::Sender<Position>,
        voice_options: VoiceOptions,
        sink: Arc<dyn AudioSink>,
        loader: Arc<ChunkLoader>,
    ) -> Self {
        let reader_id = ReaderId::next();
        let (is_playing_tx, _) = watch::channel(false);
        let destroyed = Arc::new(AtomicBool::new(false));

        let driver = tokio::spawn(drive(DriveArgs {
            reader_id,
            chunks: Arc::clone(&chunks),
            position_tx: position_tx.clone(),
            position_rx: position_tx.subscribe(),
            voice_options,
            sink,
            loader: Arc::clone(&loader),
            is_playing_tx: is_playing_tx.clone(),
            destroyed: Arc::clone(&destroyed),
        }));

        Self {
            reader_id,
            chunks,
            is_playing_tx,
            destroyed,
            driver: std::sync::Mutex::new(Some(driver)),
            loader,
        }
    }

    pub fn is_playing(&self) -> bool {
        *self.is_playing_tx.subscribe().borrow()
    }

    pub fn reader_id(&self) -> ReaderId {
        self.reader_id
    }

    /// Tear down: stop reacting, release this reader's loader registrations,
    /// and clear transient per-chunk state so a replacement switcher starts
    /// clean (§4.6 "On destroy").
    pub async fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.driver.lock().unwrap().take() {
            handle.abort();
        }
        self.loader.expire(self.reader_id).await;
        let mut guard = self.chunks.lock().await;
        for chunk in guard.iter_mut() {
            chunk.reset_audio_state();
        }
    }
}

struct DriveArgs {
    reader_id: ReaderId,
    chunks: Arc<Mutex<Vec<Chunk>>>,
    position_tx: watch::Sender<Position>,
    position_rx: watch::Receiver<Position>,
    voice_options: VoiceOptions,
    sink: Arc<dyn AudioSink>,
    loader: Arc<ChunkLoader>,
    is_playing_tx: watch::Sender<bool>,
    destroyed: Arc<AtomicBool>,
}

async fn drive(mut args: DriveArgs) {
    let mut track_status_rx = args.sink.subscribe_track_status();
    let mut is_playing_rx = args.sink.subscribe_is_playing();

    populate_upcoming(&args).await;
    if args.sink.is_playing() {
        activate(&args).await;
    }

    loop {
        if args.destroyed.load(Ordering::SeqCst) {
            return;
        }
        tokio::select! {
            changed = args.position_rx.changed() => {
                if changed.is_err() || args.destroyed.load(Ordering::SeqCst) {
                    return;
                }
                activate(&args).await;
            }
            changed = track_status_rx.changed() => {
                if changed.is_err() || args.destroyed.load(Ordering::SeqCst) {
                    return;
                }
                if *track_status_rx.borrow() == TrackStatus::Complete {
                    let len = args.chunks.lock().await.len();
                    let cur = *args.position_rx.borrow();
                    let next = next_position(cur, len);
                    let _ = args.position_tx.send(next);
                    if matches!(next, Position::Completed) {
                        let _ = args.is_playing_tx.send(false);
                    }
                }
            }
            changed = is_playing_rx.changed() => {
                if changed.is_err() || args.destroyed.load(Ordering::SeqCst) {
                    return;
                }
                if *is_playing_rx.borrow() {
                    let idx = args.position_rx.borrow().index();
                    let already_loading = match idx {
                        Some(i) => args.chunks.lock().await.get(i).map(Chunk::is_loading).unwrap_or(false),
                        None => false,
                    };
                    if !already_loading {
                        activate(&args).await;
                    }
                } else {
                    let _ = args.is_playing_tx.send(false);
                }
            }
        }
    }
}

async fn populate_upcoming(args: &DriveArgs) {
    let idx = match args.position_rx.borrow().index() {
        Some(i) => i,
        None => return,
    };
    args.loader.expire_before(args.reader_id, idx).await;

    // Priorities are the chunks' absolute document indices, not a local
    // counter: `expire_before` drops registrations below a position
    // threshold, so registration priority and position must share one
    // index space.
    let mut to_preload = Vec::with_capacity(PREFETCH_WINDOW);
    {
        let guard = args.chunks.lock().await;
        for (offset, chunk) in guard.iter().enumerate().skip(idx) {
            if to_preload.len() >= PREFETCH_WINDOW {
                break;
            }
            if !chunk.is_blank() {
                to_preload.push((chunk.cleaned_text().to_string(), offset));
            }
        }
    }
    for (text, priority) in to_preload {
        args.loader.preload(&text, &args.voice_options, args.reader_id, priority).await;
    }
}

async fn activate(args: &DriveArgs) {
    populate_upcoming(args).await;

    let idx = match args.position_rx.borrow().index() {
        Some(i) => i,
        None => {
            let _ = args.is_playing_tx.send(false);
            return;
        }
    };

    let blank = {
        let guard = args.chunks.lock().await;
        guard.get(idx).map(Chunk::is_blank).unwrap_or(true)
    };
    if blank {
        let len = args.chunks.lock().await.len();
        let next = next_position(Position::At(idx), len);
        let _ = args.position_tx.send(next);
        return;
    }

    let already_loading = {
        let guard = args.chunks.lock().await;
        guard.get(idx).map(Chunk::is_loading).unwrap_or(false)
    };
    if already_loading {
        // An in-flight activation for this chunk will finish the transition.
        return;
    }

    let cleaned_text = {
        let mut guard = args.chunks.lock().await;
        let Some(chunk) = guard.get_mut(idx) else { return };
        chunk.set_loading(true);
        chunk.cleaned_text().to_string()
    };

    verbose!("switcher: loading chunk {idx}");
    let result = args.loader.load(&cleaned_text, &args.voice_options, args.reader_id).await;

    if args.destroyed.load(Ordering::SeqCst) {
        return;
    }
    // The session may have moved on, or the chunk at `idx` may have been
    // edited underneath this in-flight load, while it was in flight; abandon
    // a stale result in either case (the loader still cached it for future
    // use, §5). Checking the index alone misses an in-place edit that lands
    // on the *current* chunk: the index is unchanged but the text that was
    // actually synthesized no longer matches it.
    let still_current = {
        let guard = args.chunks.lock().await;
        args.position_rx.borrow().index() == Some(idx)
            && guard.get(idx).map(|c| c.cleaned_text() == cleaned_text).unwrap_or(false)
    };
    if !still_current {
        return;
    }

    match result {
        Ok(bytes) => {
            {
                let mut guard = args.chunks.lock().await;
                if let Some(chunk) = guard.get_mut(idx) {
                    chunk.attach_audio(bytes.clone(), None);
                }
            }
            if let Err(e) = args.sink.switch_media(bytes.clone()).await {
                warn!("switcher: sink rejected media for chunk {idx}: {e}");
                let mut guard = args.chunks.lock().await;
                if let Some(chunk) = guard.get_mut(idx) {
                    chunk.mark_failed(FailureInfo {
                        message: e.to_string(),
                        http_code: None,
                        retryable: false,
                    });
                }
                drop(guard);
                args.sink.pause();
                let _ = args.is_playing_tx.send(false);
                return;
            }
            let _ = args.is_playing_tx.send(true);

            match args.sink.get_audio_buffer(&bytes).await {
                Ok(decoded) => {
                    let mut guard = args.chunks.lock().await;
                    if let Some(chunk) = guard.get_mut(idx) {
                        chunk.attach_decoded(decoded);
                    }
                }
                Err(e) => verbose!("switcher: decode failed for chunk {idx} (non-fatal): {e}"),
            }
        }
        Err(e) => {
            let info = FailureInfo {
                message: e.to_string(),
                http_code: match &e {
                    crate::provider::SynthesisError::Http { http_code, .. } => Some(*http_code),
                    _ => None,
                },
                retryable: e.is_retryable(),
            };
            let mut guard = args.chunks.lock().await;
            if let Some(chunk) = guard.get_mut(idx) {
                chunk.mark_failed(info);
            }
            drop(guard);
            warn!("switcher: chunk {idx} failed to load: {e}");
            args.sink.pause();
            let _ = args.is_playing_tx.send(false);
        }
    }
}
