//! Store (C8, §4.8): the top-level handle embedders construct once. Holds
//! at most one active session and the background cache-expiry interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::AudioCache;
use crate::chunk::{AudioText, TextCleaner};
use crate::loader::ChunkLoader;
use crate::sink::AudioSink;
use crate::voice::VoiceOptions;
use crate::{info, verbose};

use crate::session::ActiveSession;

/// Expiry interval is scaled to the configured cache TTL, bounded to
/// `[MIN_EXPIRY_INTERVAL, MAX_EXPIRY_INTERVAL]` (§4.8).
const MIN_EXPIRY_INTERVAL: Duration = Duration::from_secs(1);
const MAX_EXPIRY_INTERVAL: Duration = Duration::from_secs(60);

/// Holds at most one [`ActiveSession`] plus the process-wide cache and sink
/// it shares with every session it creates.
pub struct Store {
    session: Mutex<Option<Arc<ActiveSession>>>,
    cache: Arc<dyn AudioCache>,
    sink: Arc<dyn AudioSink>,
    loader: Arc<ChunkLoader>,
    cleaner: Arc<dyn TextCleaner>,
    cache_ttl_millis: AtomicU64,
    expiry_cancel: CancellationToken,
    expiry_task: Mutex<Option<JoinHandle<()>>>,
}

impl Store {
    pub fn new(
        cache: Arc<dyn AudioCache>,
        sink: Arc<dyn AudioSink>,
        loader: Arc<ChunkLoader>,
        cleaner: Arc<dyn TextCleaner>,
        cache_ttl_millis: u64,
    ) -> Arc<Self> {
        let expiry_cancel = CancellationToken::new();
        let store = Arc::new(Self {
            session: Mutex::new(None),
            cache,
            sink,
            loader,
            cleaner,
            cache_ttl_millis: AtomicU64::new(cache_ttl_millis),
            expiry_cancel,
            expiry_task: Mutex::new(None),
        });

        let handle = tokio::spawn(run_expiry_loop(Arc::clone(&store)));
        *store.expiry_task.try_lock().expect("no contention at construction") = Some(handle);
        store
    }

    /// Update the configured cache TTL; takes effect on the expiry loop's
    /// next tick.
    pub fn set_cache_ttl_millis(&self, millis: u64) {
        self.cache_ttl_millis.store(millis, Ordering::Relaxed);
    }

    /// Destroy any existing session, chunk the given text, build a fresh
    /// session, and start it playing (§4.8).
    pub async fn start_player(&self, audio_text: AudioText, voice_options: VoiceOptions) -> Arc<ActiveSession> {
        self.close_player().await;
        let session = Arc::new(
            ActiveSession::new(
                audio_text,
                voice_options,
                Arc::clone(&self.sink),
                Arc::clone(&self.loader),
                Arc::clone(&self.cleaner),
            )
            .await,
        );
        session.play();
        *self.session.lock().await = Some(Arc::clone(&session));
        session
    }

    pub async fn close_player(&self) {
        if let Some(session) = self.session.lock().await.take() {
            session.destroy().await;
        }
    }

    pub async fn active_session(&self) -> Option<Arc<ActiveSession>> {
        self.session.lock().await.clone()
    }

    pub async fn destroy(&self) {
        self.expiry_cancel.cancel();
        if let Some(handle) = self.expiry_task.lock().await.take() {
            let _ = handle.await;
        }
        self.close_player().await;
    }
}

fn expiry_interval_for(cache_ttl_millis: u64) -> Duration {
    let scaled = Duration::from_millis(cache_ttl_millis / 10);
    scaled.clamp(MIN_EXPIRY_INTERVAL, MAX_EXPIRY_INTERVAL)
}

async fn run_expiry_loop(store: Arc<Store>) {
    loop {
        let interval = expiry_interval_for(store.cache_ttl_millis.load(Ordering::Relaxed));
        tokio::select! {
            _ = store.expiry_cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
        let ttl = store.cache_ttl_millis.load(Ordering::Relaxed);
        verbose!("store: expiring cache entries older than {ttl}ms");
        if let Err(e) = store.cache.expire(ttl).await {
            info!("store: cache expiry failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_interval_is_bounded() {
        assert_eq!(expiry_interval_for(0), MIN_EXPIRY_INTERVAL);
        assert_eq!(expiry_interval_for(100_000_000), MAX_EXPIRY_INTERVAL);
        assert_eq!(expiry_interval_for(100_000), Duration::from_millis(10_000));
    }
}
