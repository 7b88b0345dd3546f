//! # Consistent-Hash Ring
//!
//! Maps a key to an owning peer by consistent hashing with virtual nodes.
//!
//! ## Design Principles
//!
//! 1. **Sorted Points, Binary Search**: the point sequence is a plain sorted
//!    `Vec<u32>`; `get` binary-searches it. This (not a `BTreeMap`) is what
//!    reproduces the canonical CRC32 test vectors exactly, since it matches
//!    groupcache's own point-generation and search order bit-for-bit.
//! 2. **CRC32-IEEE Default**: `crc32fast` matches the reference hash used to
//!    derive the canonical test vectors; callers may supply their own.
//! 3. **Not Concurrency-Safe**: the ring is rebuilt wholesale under a lock
//!    one level up whenever the peer set changes (see `crate::registry`'s
//!    default peer-picker guidance); `Ring` itself assumes single-threaded
//!    mutation.
//!
//! Diverges from groupcache's `Ring` in two ways: double-`Add` of a peer is
//! rejected instead of silently appending duplicate points, and `Remove` is
//! computed by filtering rather than by deleting while iterating the owner
//! map (groupcache's `Remove` has an ordering bug where it also returns
//! points it just deleted).

use ahash::RandomState;
use hashbrown::{HashMap, HashSet};

/// A hash function from arbitrary bytes to a 32-bit point on the ring.
pub type HashFn = Box<dyn Fn(&[u8]) -> u32 + Send + Sync>;

fn crc32_ieee(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Error returned when a ring operation is asked to do something undefined.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RingError {
    /// `add` was called with a peer identifier already present in the ring,
    /// either from an earlier call or repeated within the same `peer_ids`
    /// slice.
    #[error("peer {0:?} is already present in the ring")]
    PeerAlreadyAdded(String),
}

/// Consistent-hash ring with virtual nodes.
pub struct Ring {
    replicas: usize,
    hash_fn: HashFn,
    /// Sorted ascending; every point has a matching entry in `owners`.
    points: Vec<u32>,
    owners: HashMap<u32, String, RandomState>,
    peers: HashSet<String, RandomState>,
}

impl Ring {
    /// Creates an empty ring. `replicas` is the virtual-node multiplier per
    /// peer (the design's default is 50). `hash_fn` defaults to CRC32-IEEE.
    pub fn new(replicas: usize, hash_fn: Option<HashFn>) -> Self {
        Ring {
            replicas,
            hash_fn: hash_fn.unwrap_or_else(|| Box::new(crc32_ieee)),
            points: Vec::new(),
            owners: HashMap::default(),
            peers: HashSet::default(),
        }
    }

    /// Number of distinct peers currently on the ring.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Number of virtual points currently on the ring.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Adds each peer's virtual points to the ring and re-sorts once.
    ///
    /// Rejects a peer identifier already present, rather than reproducing
    /// the ambiguous duplicate-point behavior of appending a second copy of
    /// the same peer's points. This also rejects a peer id repeated within
    /// `peer_ids` itself, checked incrementally against the peers seen so
    /// far in this same call, not just against `self.peers` as it stood
    /// before the call.
    pub fn add(&mut self, peer_ids: &[&str]) -> Result<(), RingError> {
        let mut seen_this_call = HashSet::<&str, RandomState>::default();
        for &peer in peer_ids {
            if self.peers.contains(peer) || !seen_this_call.insert(peer) {
                return Err(RingError::PeerAlreadyAdded(peer.to_string()));
            }
        }

        for &peer in peer_ids {
            for i in 0..self.replicas {
                let point = (self.hash_fn)(virtual_key(i, peer).as_bytes());
                self.points.push(point);
                // First point seen at a given hash wins ownership (spec tie-break).
                self.owners.entry(point).or_insert_with(|| peer.to_string());
            }
            self.peers.insert(peer.to_string());
        }

        self.points.sort_unstable();
        Ok(())
    }

    /// Returns the peer that owns `key`, or `None` if the ring is empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.points.is_empty() {
            return None;
        }
        let h = (self.hash_fn)(key.as_bytes());
        let idx = match self.points.binary_search(&h) {
            Ok(found) => found,
            Err(insertion_point) => {
                if insertion_point == self.points.len() {
                    0
                } else {
                    insertion_point
                }
            }
        };
        self.owners.get(&self.points[idx]).map(String::as_str)
    }

    /// Removes every point contributed by `peer_id`, and only those.
    ///
    /// Computed by filtering to the points whose owner is *not* `peer_id`,
    /// rather than deleting while iterating the owner map: groupcache's own
    /// `Remove` has an ordering bug there (it appends every iterated key,
    /// including ones it just deleted), which the surviving sequence here
    /// must not reproduce.
    pub fn remove(&mut self, peer_id: &str) {
        if !self.peers.remove(peer_id) {
            return;
        }
        self.owners.retain(|_, owner| owner != peer_id);
        self.points.retain(|point| self.owners.contains_key(point));
    }
}

fn virtual_key(replica_index: usize, peer_id: &str) -> String {
    format!("{replica_index}{peer_id}")
}
