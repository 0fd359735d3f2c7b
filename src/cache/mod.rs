//! Audio cache (C3, §4.3).
//!
//! Content-addressed store mapping [`CacheKey`](crate::voice::CacheKey) to
//! synthesized audio bytes, with age-based expiry. The store itself is
//! pluggable: this module defines the trait contract and ships an
//! in-memory implementation; a persistent on-disk backing store is an
//! external collaborator per §1/§6.

mod memory;

pub use memory::InMemoryAudioCache;

use async_trait::async_trait;

use crate::voice::CacheKey;

/// Errors from the audio cache backing store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backing store could not be read.
    #[error("cache read failed: {0}")]
    Read(String),
    /// The backing store could not be written.
    #[error("cache write failed: {0}")]
    Write(String),
}

/// Content-addressed audio cache.
///
/// `get` after `put` with the same key returns the same bytes until
/// `expire` evicts the entry. Concurrent `put`s to the same key are not
/// deduplicated; last write wins (§4.3).
#[async_trait]
pub trait AudioCache: Send + Sync {
    /// Fetch cached audio for `key`, or `None` on a cache miss.
    async fn get(&self, key: CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `bytes` under `key`, overwriting any previous entry.
    async fn put(&self, key: CacheKey, bytes: Vec<u8>) -> Result<(), CacheError>;

    /// Evict entries older than `max_age_millis`.
    async fn expire(&self, max_age_millis: u64) -> Result<(), CacheError>;

    /// Total size of cached audio, in bytes.
    async fn size_bytes(&self) -> u64;
}
