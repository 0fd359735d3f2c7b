//! Chunk loader (C4, §4.4): dedup, prefetch, cancellation, and retry/backoff
//! against the synthesis provider, backed by the audio cache (C3).
//!
//! A single background task serializes synthesis calls ("at most one
//! synthesis call is outstanding at any moment", §4.4/§5) and resolves every
//! waiter attached to the same [`CacheKey`] from one call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::AudioCache;
use crate::provider::retry::{self, RetryConfig, COOLDOWN, MAX_ATTEMPTS};
use crate::provider::{SynthesisError, SynthesisRequest};
use crate::voice::{CacheKey, VoiceHash, VoiceOptions};
use crate::{error, info, verbose, warn};

/// Opaque token identifying a [`crate::switcher::ChunkSwitcher`] instance to
/// the loader, for per-reader priority bookkeeping and cancellation (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReaderId(u64);

impl ReaderId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SlotState {
    Pending,
    InFlight,
    Resolved,
    Failed,
}

struct LoadSlot {
    text: String,
    options: VoiceOptions,
    bytes: Option<Vec<u8>>,
    error: Option<SynthesisError>,
    state: SlotState,
    waiters: Vec<oneshot::Sender<Result<Vec<u8>, SynthesisError>>>,
    registrations: HashMap<ReaderId, usize>,
    attempts: u32,
    cooldown_until: Option<Instant>,
}

impl LoadSlot {
    fn new(text: String, options: VoiceOptions) -> Self {
        Self {
            text,
            options,
            bytes: None,
            error: None,
            state: SlotState::Pending,
            waiters: Vec::new(),
            registrations: HashMap::new(),
            attempts: 0,
            cooldown_until: None,
        }
    }

    fn min_priority(&self) -> Option<usize> {
        self.registrations.values().copied().min()
    }

    fn is_schedulable(&self, now: Instant) -> bool {
        if self.state != SlotState::Pending {
            return false;
        }
        if self.registrations.is_empty() {
            return false;
        }
        match self.cooldown_until {
            Some(t) if now < t => false,
            _ => self.attempts < MAX_ATTEMPTS,
        }
    }
}

/// Configuration for the loader's background scheduler.
#[derive(Debug, Clone)]
pub struct ChunkLoaderConfig {
    /// Period between scheduler ticks when the work queue is empty (§4.4:
    /// "default ~1s").
    pub tick_interval: Duration,
    pub retry: RetryConfig,
}

impl Default for ChunkLoaderConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            retry: RetryConfig::default(),
        }
    }
}

/// Orchestrates synthesis requests: dedup by [`CacheKey`], reader-scoped
/// prefetch priorities, serial background synthesis, retry/backoff.
pub struct ChunkLoader {
    cache: Arc<dyn AudioCache>,
    http_client: reqwest::Client,
    config: ChunkLoaderConfig,
    slots: Mutex<HashMap<CacheKey, LoadSlot>>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ChunkLoader {
    pub fn new(cache: Arc<dyn AudioCache>, http_client: reqwest::Client, config: ChunkLoaderConfig) -> Arc<Self> {
        let loader = Arc::new(Self {
            cache,
            http_client,
            config,
            slots: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
            worker: Mutex::new(None),
        });
        let handle = tokio::spawn(run_worker(Arc::clone(&loader)));
        // `worker` is only written once, at construction, before any other
        // method can observe `loader`; try_lock cannot fail here.
        if let Ok(mut slot) = loader.worker.try_lock() {
            *slot = Some(handle);
        }
        loader
    }

    /// Register speculative interest in `text` under `options`, without
    /// awaiting resolution (§4.4 `preload`).
    pub async fn preload(&self, text: &str, options: &VoiceOptions, reader: ReaderId, priority: usize) {
        let key = cache_key_for(options, text);
        let mut slots = self.slots.lock().await;
        let slot = slots
            .entry(key)
            .or_insert_with(|| LoadSlot::new(text.to_string(), options.clone()));
        slot.registrations.insert(reader, priority);
    }

    /// Resolve `text` under `options` to audio bytes, guaranteeing at most
    /// one concurrent synthesis call per [`CacheKey`] (§4.4 `load`).
    pub async fn load(&self, text: &str, options: &VoiceOptions, reader: ReaderId) -> Result<Vec<u8>, SynthesisError> {
        let key = cache_key_for(options, text);

        // Cache hit short-circuits without touching the slot table.
        if let Ok(Some(bytes)) = self.cache.get(key).await {
            return Ok(bytes);
        }

        let rx = {
            let mut slots = self.slots.lock().await;
            let slot = slots
                .entry(key)
                .or_insert_with(|| LoadSlot::new(text.to_string(), options.clone()));
            slot.registrations.entry(reader).or_insert(0);

            match slot.state {
                SlotState::Resolved => return Ok(slot.bytes.clone().unwrap_or_default()),
                SlotState::Failed if slot.attempts >= MAX_ATTEMPTS => {
                    return Err(slot.error.clone().unwrap_or(SynthesisError::Transport("unknown failure".into())));
                }
                SlotState::Failed => match slot.cooldown_until {
                    Some(t) if Instant::now() < t => {
                        return Err(slot.error.clone().unwrap_or(SynthesisError::Transport("cooldown active".into())));
                    }
                    _ => {
                        slot.state = SlotState::Pending;
                    }
                },
                _ => {}
            }

            let (tx, rx) = oneshot::channel();
            slot.waiters.push(tx);
            rx
        };

        rx.await.unwrap_or_else(|_| Err(SynthesisError::Transport("loader shut down".into())))
    }

    /// Drop `reader`'s registrations below `priority_index` (§4.4
    /// `expireBefore`, used when playback advances past them).
    pub async fn expire_before(&self, reader: ReaderId, priority_index: usize) {
        let mut slots = self.slots.lock().await;
        for slot in slots.values_mut() {
            if let Some(p) = slot.registrations.get(&reader) {
                if *p < priority_index {
                    slot.registrations.remove(&reader);
                }
            }
        }
    }

    /// Drop all of `reader`'s registrations (§4.4 `expire`). In-flight
    /// synthesis for an abandoned slot is left to complete and populate the
    /// cache, per §5 Cancellation.
    pub async fn expire(&self, reader: ReaderId) {
        let mut slots = self.slots.lock().await;
        for slot in slots.values_mut() {
            slot.registrations.remove(&reader);
        }
    }

    /// Cancel the background worker and drop all state.
    pub async fn destroy(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.worker.lock().await.take() {
            let _ = handle.await;
        }
    }
}

fn cache_key_for(options: &VoiceOptions, cleaned_text: &str) -> CacheKey {
    CacheKey::compute(VoiceHash::compute(options), cleaned_text)
}

async fn run_worker(loader: Arc<ChunkLoader>) {
    loop {
        let picked = {
            let now = Instant::now();
            let slots = loader.slots.lock().await;
            slots
                .iter()
                .filter(|(_, slot)| slot.is_schedulable(now))
                .min_by_key(|(_, slot)| slot.min_priority().unwrap_or(usize::MAX))
                .map(|(key, _)| *key)
        };

        let Some(key) = picked else {
            tokio::select! {
                _ = loader.cancel.cancelled() => return,
                _ = tokio::time::sleep(loader.config.tick_interval) => continue,
            }
        };

        if process_slot(&loader, key).await {
            continue; // more work may be ready immediately
        }

        tokio::select! {
            _ = loader.cancel.cancelled() => return,
            _ = tokio::time::sleep(loader.config.tick_interval) => {}
        }
    }
}

/// Run one synthesis attempt (with inline retry/backoff up to
/// [`MAX_ATTEMPTS`]) for the slot at `key`. Returns `true` if the slot
/// reached a terminal state and the worker should immediately look for more
/// work rather than sleeping a full tick.
async fn process_slot(loader: &ChunkLoader, key: CacheKey) -> bool {
    let (text, options) = {
        let mut slots = loader.slots.lock().await;
        let Some(slot) = slots.get_mut(&key) else { return true };
        slot.state = SlotState::InFlight;
        (slot.text.clone(), slot.options.clone())
    };

    if let Ok(Some(bytes)) = loader.cache.get(key).await {
        verbose!("loader: cache hit for {key}");
        resolve(loader, key, Ok(bytes)).await;
        return true;
    }

    let Some(backend) = crate::provider::registry().get(&options.provider) else {
        let err = SynthesisError::UnknownProvider(options.provider.clone());
        resolve(loader, key, Err(err)).await;
        return true;
    };

    let request = SynthesisRequest {
        text: text.clone(),
        options: options.clone(),
    };

    let mut attempt = {
        let slots = loader.slots.lock().await;
        slots.get(&key).map(|s| s.attempts).unwrap_or(0)
    };

    loop {
        verbose!("loader: synthesizing {key} (attempt {attempt})");
        match backend.synthesize(&loader.http_client, &request).await {
            Ok(result) => {
                if let Err(e) = loader.cache.put(key, result.audio.clone()).await {
                    warn!("loader: cache write failed for {key}: {e}");
                }
                resolve(loader, key, Ok(result.audio)).await;
                return true;
            }
            Err(e) => {
                attempt += 1;
                let retryable = e.is_retryable();
                let mut slots = loader.slots.lock().await;
                let Some(slot) = slots.get_mut(&key) else { return true };
                slot.attempts = attempt;

                if retryable && attempt < MAX_ATTEMPTS {
                    let is_rate_limited = matches!(&e, SynthesisError::Http { http_code, .. } if retry::is_rate_limited(reqwest::StatusCode::from_u16(*http_code).unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR)));
                    let delay = loader.config.retry.delay_for_attempt(attempt - 1, is_rate_limited);
                    slot.state = SlotState::Pending;
                    slot.cooldown_until = Some(Instant::now() + delay.min(COOLDOWN));
                    drop(slots);
                    error!("loader: synthesis attempt {attempt} failed for {key}, retrying in {delay:?}: {e}");
                    tokio::select! {
                        _ = loader.cancel.cancelled() => return true,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }

                slot.state = SlotState::Failed;
                slot.error = Some(e.clone());
                slot.cooldown_until = Some(Instant::now() + COOLDOWN);
                drop(slots);
                error!("loader: chunk permanently failed after {attempt} attempt(s): {e}");
                resolve(loader, key, Err(e)).await;
                return true;
            }
        }
    }
}

async fn resolve(loader: &ChunkLoader, key: CacheKey, result: Result<Vec<u8>, SynthesisError>) {
    let mut slots = loader.slots.lock().await;
    let Some(slot) = slots.get_mut(&key) else { return };
    match &result {
        Ok(bytes) => {
            slot.state = SlotState::Resolved;
            slot.bytes = Some(bytes.clone());
            slot.error = None;
        }
        Err(e) => {
            slot.state = SlotState::Failed;
            slot.error = Some(e.clone());
        }
    }
    for waiter in slot.waiters.drain(..) {
        let _ = waiter.send(result.clone());
    }
    info!("loader: resolved {key}: {}", if result.is_ok() { "ok" } else { "failed" });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryAudioCache;

    fn options_for(provider: &'static str) -> VoiceOptions {
        VoiceOptions::new(provider, "m", "v")
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_slot_and_agree_on_the_result() {
        // No API key is configured, so the built-in openai backend fails
        // fast with a typed, non-retryable error instead of making a
        // network call — exercising the dedup path without I/O.
        let cache = Arc::new(InMemoryAudioCache::new());
        let loader = ChunkLoader::new(
            cache,
            reqwest::Client::new(),
            ChunkLoaderConfig {
                tick_interval: Duration::from_millis(5),
                ..Default::default()
            },
        );

        let options = options_for("openai");
        let r1 = ReaderId::next();
        let r2 = ReaderId::next();

        let (res1, res2) = tokio::join!(
            loader.load("hello", &options, r1),
            loader.load("hello", &options, r2)
        );
        assert!(res1.is_err() && res2.is_err());

        let key = cache_key_for(&options, "hello");
        {
            let slots = loader.slots.lock().await;
            assert_eq!(slots.len(), 1, "both loads must dedup onto one slot");
            assert!(slots.contains_key(&key));
        }
        loader.destroy().await;
    }

    #[tokio::test]
    async fn expire_before_drops_low_priority_registrations() {
        let cache = Arc::new(InMemoryAudioCache::new());
        let loader = ChunkLoader::new(cache, reqwest::Client::new(), ChunkLoaderConfig::default());
        let options = options_for("openai");
        let reader = ReaderId::next();

        loader.preload("a", &options, reader, 0).await;
        loader.preload("b", &options, reader, 1).await;
        loader.expire_before(reader, 1).await;

        let slots = loader.slots.lock().await;
        let key_a = cache_key_for(&options, "a");
        let key_b = cache_key_for(&options, "b");
        assert!(!slots[&key_a].registrations.contains_key(&reader));
        assert!(slots[&key_b].registrations.contains_key(&reader));
        drop(slots);
        loader.destroy().await;
    }
}
