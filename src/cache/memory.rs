//! In-memory audio cache, suitable for tests and as a default when no
//! persistent backing store is wired in.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{AudioCache, CacheError};
use crate::voice::CacheKey;

struct Entry {
    bytes: Vec<u8>,
    inserted_at: Instant,
}

/// Process-local, `HashMap`-backed [`AudioCache`] with age-based expiry.
pub struct InMemoryAudioCache {
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl InMemoryAudioCache {
    /// Construct an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryAudioCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioCache for InMemoryAudioCache {
    async fn get(&self, key: CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.lock().await.get(&key).map(|e| e.bytes.clone()))
    }

    async fn put(&self, key: CacheKey, bytes: Vec<u8>) -> Result<(), CacheError> {
        self.entries.lock().await.insert(
            key,
            Entry {
                bytes,
                inserted_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn expire(&self, max_age_millis: u64) -> Result<(), CacheError> {
        let max_age = std::time::Duration::from_millis(max_age_millis);
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .retain(|_, entry| now.duration_since(entry.inserted_at) < max_age);
        Ok(())
    }

    async fn size_bytes(&self) -> u64 {
        self.entries
            .lock()
            .await
            .values()
            .map(|e| e.bytes.len() as u64)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_then_expire() {
        let cache = InMemoryAudioCache::new();
        let key = CacheKey::compute(
            crate::voice::VoiceHash::compute(&crate::voice::VoiceOptions::new("p", "m", "v")),
            "hello",
        );

        assert_eq!(cache.get(key).await.unwrap(), None);
        cache.put(key, vec![1, 2, 3]).await.unwrap();
        assert_eq!(cache.get(key).await.unwrap(), Some(vec![1, 2, 3]));

        cache.expire(0).await.unwrap();
        assert_eq!(cache.get(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn last_write_wins() {
        let cache = InMemoryAudioCache::new();
        let key = CacheKey::compute(
            crate::voice::VoiceHash::compute(&crate::voice::VoiceOptions::new("p", "m", "v")),
            "hello",
        );
        cache.put(key, vec![1]).await.unwrap();
        cache.put(key, vec![2]).await.unwrap();
        assert_eq!(cache.get(key).await.unwrap(), Some(vec![2]));
    }

    #[tokio::test]
    async fn size_bytes_sums_entries() {
        let cache = InMemoryAudioCache::new();
        let voice = crate::voice::VoiceHash::compute(&crate::voice::VoiceOptions::new("p", "m", "v"));
        cache.put(CacheKey::compute(voice, "a"), vec![0; 10]).await.unwrap();
        cache.put(CacheKey::compute(voice, "b"), vec![0; 5]).await.unwrap();
        assert_eq!(cache.size_bytes().await, 15);
    }
}
