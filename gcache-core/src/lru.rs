//! # Bounded LRU Cache
//!
//! A byte-accounted, recency-ordered cache keyed by string.
//!
//! ## Design Principles
//!
//! 1. **Index Arena, Not Pointers**: nodes live in a dense `Vec<Option<Node>>`
//!    with index-typed `prev`/`next` links and a free-list of recycled slots,
//!    instead of an intrusive pointer list. No `unsafe` anywhere in this file.
//! 2. **Byte-Based Eviction**: capacity is a byte budget, not an entry count;
//!    `nbytes` tracks `len(key) + value.size()` summed over live entries.
//! 3. **Synchronous Eviction Callback**: `on_evicted` runs inline inside
//!    `add`/`remove_oldest`, before the call returns.
//!
//! Not safe for concurrent use — callers serialize access one level up (see
//! `crate::store::ShardedStore`).

use ahash::RandomState;
use hashbrown::HashMap;

use gcache_common::ByteView;

struct Node {
    key: String,
    value: ByteView,
    prev: Option<usize>,
    next: Option<usize>,
}

/// A bounded-capacity, recency-ordered cache.
///
/// `head` is the least-recently-used node (evicted first); `tail` is the
/// most-recently-used node (where fresh and touched entries land).
pub struct LruCache {
    max_bytes: usize,
    nbytes: usize,
    index: HashMap<String, usize, RandomState>,
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    on_evicted: Option<Box<dyn FnMut(&str, &ByteView) + Send>>,
}

impl LruCache {
    /// Creates a cache with the given byte budget. `max_bytes == 0` means
    /// unlimited: `add` never evicts.
    pub fn new(max_bytes: usize) -> Self {
        LruCache {
            max_bytes,
            nbytes: 0,
            index: HashMap::default(),
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            on_evicted: None,
        }
    }

    /// Installs a callback invoked synchronously, exactly once per eviction,
    /// with the evicted key and value. Must not re-enter this cache.
    pub fn set_on_evicted<F>(&mut self, f: F)
    where
        F: FnMut(&str, &ByteView) + Send + 'static,
    {
        self.on_evicted = Some(Box::new(f));
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total bytes occupied by live entries: `Σ(len(key) + value.size())`.
    pub fn nbytes(&self) -> usize {
        self.nbytes
    }

    /// Looks up `key`, moving it to most-recently-used on a hit.
    pub fn get(&mut self, key: &str) -> Option<ByteView> {
        let idx = *self.index.get(key)?;
        self.touch(idx);
        Some(self.nodes[idx].as_ref().expect("indexed node exists").value.clone())
    }

    /// Inserts or updates `key`, then evicts from the back while over
    /// budget. A single `add` may evict the entry it just inserted if that
    /// entry alone exceeds `max_bytes`.
    pub fn add(&mut self, key: impl Into<String>, value: ByteView) {
        let key = key.into();
        if let Some(&idx) = self.index.get(&key) {
            let old_size = {
                let node = self.nodes[idx].as_ref().expect("indexed node exists");
                entry_size(&node.key, &node.value)
            };
            let new_size = entry_size(&key, &value);
            self.nodes[idx].as_mut().expect("indexed node exists").value = value;
            self.nbytes = self.nbytes + new_size - old_size;
            self.touch(idx);
        } else {
            let size = entry_size(&key, &value);
            self.insert_new(key, value);
            self.nbytes += size;
        }

        if self.max_bytes > 0 {
            while self.nbytes > self.max_bytes {
                if !self.remove_oldest() {
                    break;
                }
            }
        }
    }

    /// Evicts the least-recently-used entry. Returns `false` if the cache
    /// was already empty.
    pub fn remove_oldest(&mut self) -> bool {
        let Some(idx) = self.head else {
            return false;
        };
        self.remove_idx(idx);
        true
    }

    fn insert_new(&mut self, key: String, value: ByteView) -> usize {
        let idx = self.free.pop().unwrap_or_else(|| {
            self.nodes.push(None);
            self.nodes.len() - 1
        });

        self.nodes[idx] = Some(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.push_back(idx);
        self.index.insert(key, idx);
        idx
    }

    fn remove_idx(&mut self, idx: usize) {
        let node = self.nodes[idx].take().expect("slot occupied");
        self.detach(node.prev, node.next);
        self.index.remove(&node.key);
        self.free.push(idx);

        let size = entry_size(&node.key, &node.value);
        self.nbytes -= size;

        if let Some(cb) = self.on_evicted.as_mut() {
            cb(&node.key, &node.value);
        }
    }

    /// Detaches a node from the recency list given its current links.
    fn detach(&mut self, prev: Option<usize>, next: Option<usize>) {
        if let Some(prev_idx) = prev {
            self.nodes[prev_idx].as_mut().expect("linked node exists").next = next;
        } else {
            self.head = next;
        }

        if let Some(next_idx) = next {
            self.nodes[next_idx].as_mut().expect("linked node exists").prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn push_back(&mut self, idx: usize) {
        let tail = self.tail;
        if let Some(node) = self.nodes[idx].as_mut() {
            node.prev = tail;
            node.next = None;
        }
        if let Some(tail_idx) = tail {
            self.nodes[tail_idx].as_mut().expect("tail node exists").next = Some(idx);
        } else {
            self.head = Some(idx);
        }
        self.tail = Some(idx);
    }

    /// Moves `idx` to most-recently-used, i.e. the tail.
    fn touch(&mut self, idx: usize) {
        if self.tail == Some(idx) {
            return;
        }
        let (prev, next) = {
            let node = self.nodes[idx].as_ref().expect("indexed node exists");
            (node.prev, node.next)
        };
        self.detach(prev, next);
        self.push_back(idx);
    }
}

fn entry_size(key: &str, value: &ByteView) -> usize {
    key.len() + value.size()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn v(s: &str) -> ByteView {
        ByteView::from(s)
    }

    #[test]
    fn get_reports_hit_and_miss() {
        let mut cache = LruCache::new(0);
        cache.add("a", v("1"));
        assert_eq!(cache.get("a"), Some(v("1")));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn nbytes_tracks_key_and_value_sizes() {
        let mut cache = LruCache::new(0);
        cache.add("ab", v("123")); // 2 + 3
        assert_eq!(cache.nbytes(), 5);
        cache.add("ab", v("1")); // update: 2 + 1
        assert_eq!(cache.nbytes(), 3);
    }

    #[test]
    fn evicts_least_recently_used_when_over_budget() {
        // Each entry is "k" (1 byte) + "v" (1 byte) = 2 bytes. Capacity 4 bytes
        // holds exactly two entries.
        let mut cache = LruCache::new(4);
        cache.add("a", v("1"));
        cache.add("b", v("2"));
        cache.add("c", v("3"));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(v("2")));
        assert_eq!(cache.get("c"), Some(v("3")));
        assert_eq!(cache.nbytes(), 4);
    }

    #[test]
    fn get_promotes_to_most_recently_used() {
        let mut cache = LruCache::new(4);
        cache.add("a", v("1"));
        cache.add("b", v("2"));
        cache.get("a");
        cache.add("c", v("3"));

        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(v("1")));
        assert_eq!(cache.get("c"), Some(v("3")));
    }

    #[test]
    fn on_evicted_fires_once_per_eviction_with_evicted_pair() {
        let evicted: Arc<Mutex<Vec<(String, ByteView)>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = evicted.clone();
        let mut cache = LruCache::new(2);
        cache.set_on_evicted(move |k, val| {
            recorded.lock().unwrap().push((k.to_string(), val.clone()));
        });

        cache.add("a", v("1"));
        cache.add("b", v("2"));

        let log = evicted.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0], ("a".to_string(), v("1")));
    }

    #[test]
    fn a_single_add_may_evict_itself_when_oversized() {
        let mut cache = LruCache::new(2);
        cache.add("toolong", v("value")); // size 12 > 2
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.nbytes(), 0);
    }

    #[test]
    fn zero_max_bytes_means_unbounded() {
        let mut cache = LruCache::new(0);
        for i in 0..1000 {
            cache.add(format!("key{i}"), v("x"));
        }
        assert_eq!(cache.len(), 1000);
    }

    #[test]
    fn remove_oldest_is_a_no_op_on_empty_cache() {
        let mut cache = LruCache::new(0);
        assert!(!cache.remove_oldest());
    }
}
