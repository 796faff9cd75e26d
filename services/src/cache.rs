//! Fingerprint → URL cache for previously uploaded content.
//!
//! # Design
//!
//! - Entries live in the injected [`StateStore`] under [`CACHE_KEY`]
//! - The cache is bounded: inserting a new fingerprint at capacity first
//!   evicts the oldest half of the entries, ranked by timestamp
//! - Timestamps change on write only; reads do not refresh them
//! - A mutex serializes the read-modify-write cycle against the store

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::state::{StateStore, load, save};

/// Key of the persisted cache map.
pub const CACHE_KEY: &str = "uploadCache";

/// Default maximum number of cached fingerprints.
pub const DEFAULT_CAPACITY: usize = 1000;

/// A cached upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    /// Milliseconds since the Unix epoch of the last write.
    pub timestamp: i64,
}

type CacheMap = HashMap<String, CacheEntry>;

/// Bounded upload cache over a state store.
pub struct UploadCache {
    store: Arc<dyn StateStore>,
    capacity: usize,
    lock: Mutex<()>,
}

impl UploadCache {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self::with_capacity(store, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(store: Arc<dyn StateStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            lock: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// URL previously issued for `fingerprint`.
    pub fn get(&self, fingerprint: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read()
            .remove(fingerprint)
            .map(|entry| entry.url)
    }

    /// Remember `url` for `fingerprint`.
    pub fn put(&self, fingerprint: &str, url: &str) {
        self.put_at(fingerprint, url, chrono::Utc::now().timestamp_millis());
    }

    fn put_at(&self, fingerprint: &str, url: &str, timestamp: i64) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read();

        if !entries.contains_key(fingerprint) && entries.len() >= self.capacity {
            let evicted = evict_oldest_half(&mut entries, self.capacity);
            debug!(target: "pasteup_services::cache", evicted, "upload cache at capacity");
        }

        entries.insert(
            fingerprint.to_owned(),
            CacheEntry {
                url: url.to_owned(),
                timestamp,
            },
        );
        self.write(&entries);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write(&CacheMap::new());
    }

    pub fn len(&self) -> usize {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> CacheMap {
        load(self.store.as_ref(), CACHE_KEY).unwrap_or_default()
    }

    fn write(&self, entries: &CacheMap) {
        if let Err(err) = save(self.store.as_ref(), CACHE_KEY, entries) {
            warn!(target: "pasteup_services::cache", error = %err, "failed to persist upload cache");
        }
    }
}

impl std::fmt::Debug for UploadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCache")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Remove the oldest half, and at least enough to make room for one insert.
fn evict_oldest_half(entries: &mut CacheMap, capacity: usize) -> usize {
    let count = (entries.len() / 2).max(entries.len() + 1 - capacity);

    let mut by_age: Vec<(String, i64)> = entries
        .iter()
        .map(|(key, entry)| (key.clone(), entry.timestamp))
        .collect();
    by_age.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    for (key, _) in by_age.into_iter().take(count) {
        entries.remove(&key);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStateStore;

    fn cache(capacity: usize) -> UploadCache {
        UploadCache::with_capacity(Arc::new(MemoryStateStore::new()), capacity)
    }

    #[test]
    fn put_then_get() {
        let cache = cache(10);
        assert!(cache.get("abc").is_none());

        cache.put("abc", "https://cdn.example.com/a.png");
        assert_eq!(
            cache.get("abc").as_deref(),
            Some("https://cdn.example.com/a.png")
        );
    }

    #[test]
    fn put_overwrites_existing_fingerprint() {
        let cache = cache(2);
        cache.put("a", "u1");
        cache.put("b", "u2");
        cache.put("a", "u3");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").as_deref(), Some("u3"));
        assert_eq!(cache.get("b").as_deref(), Some("u2"));
    }

    #[test]
    fn never_exceeds_capacity() {
        let cache = cache(10);
        for i in 0..25 {
            cache.put(&format!("fp{i}"), &format!("url{i}"));
            assert!(cache.len() <= 10, "len {} after insert {i}", cache.len());
        }
        assert_eq!(cache.get("fp24").as_deref(), Some("url24"));
    }

    #[test]
    fn evicts_oldest_half_by_timestamp() {
        let cache = cache(4);
        cache.put_at("d", "u-d", 40);
        cache.put_at("a", "u-a", 10);
        cache.put_at("c", "u-c", 30);
        cache.put_at("b", "u-b", 20);

        cache.put_at("e", "u-e", 50);

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
        assert!(cache.get("e").is_some());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn reads_do_not_refresh_timestamps() {
        let cache = cache(2);
        cache.put_at("old", "u-old", 1);
        cache.put_at("new", "u-new", 2);
        assert!(cache.get("old").is_some());

        cache.put_at("newest", "u-newest", 3);
        assert!(cache.get("old").is_none());
        assert!(cache.get("new").is_some());
    }

    #[test]
    fn capacity_of_one_still_bounded() {
        let cache = cache(1);
        cache.put("a", "1");
        cache.put("b", "2");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("b").as_deref(), Some("2"));
    }

    #[test]
    fn clear_empties_cache() {
        let cache = cache(10);
        cache.put("a", "1");
        cache.put("b", "2");
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn entries_persist_in_store() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        UploadCache::new(Arc::clone(&store)).put("fp", "https://x/y.png");

        let reopened = UploadCache::new(store);
        assert_eq!(reopened.get("fp").as_deref(), Some("https://x/y.png"));
    }
}
