//! # ShardedStore
//!
//! A mutex-guarded, lazily-constructed LRU cache. One lock, one LRU, one
//! capacity — this is a group's primary store. The name carries over from
//! groupcache; nothing here shards across multiple locks, and the sharding
//! that actually spreads keys across nodes happens one level up, via the
//! consistent-hash ring.

use parking_lot::Mutex;

use gcache_common::ByteView;

use crate::lru::LruCache;

pub struct ShardedStore {
    capacity_bytes: usize,
    cache: Mutex<Option<LruCache>>,
}

impl ShardedStore {
    /// `capacity_bytes == 0` means unlimited, matching `LruCache::new`.
    pub fn new(capacity_bytes: usize) -> Self {
        ShardedStore {
            capacity_bytes,
            cache: Mutex::new(None),
        }
    }

    /// Looks up `key`. Constructs the LRU on first use if it does not exist
    /// yet, so an untouched group costs nothing but a `None`.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let mut guard = self.cache.lock();
        guard.as_mut()?.get(key)
    }

    /// Inserts `key`/`value`, lazily constructing the LRU on first write.
    pub fn add(&self, key: impl Into<String>, value: ByteView) {
        let mut guard = self.cache.lock();
        let cache = guard.get_or_insert_with(|| LruCache::new(self.capacity_bytes));
        cache.add(key, value);
    }

    /// Number of live entries, or 0 if the LRU has never been constructed.
    pub fn len(&self) -> usize {
        self.cache.lock().as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
