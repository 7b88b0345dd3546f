//! # Group
//!
//! The public façade. A `Group` owns a name, a backing `Getter`, a
//! `ShardedStore`, an optional `PeerPicker`, and a private `SingleFlight`
//! loader, and composes them into the cache-aside / peer-redirect protocol
//! described in the crate's design notes.

use std::fmt;
use std::sync::{Arc, OnceLock};

use gcache_common::error::BoxError;
use gcache_common::{ByteView, GcacheError, GcacheResult};

use crate::singleflight::SingleFlight;
use crate::store::ShardedStore;

/// The caller-supplied source of truth, consulted on a local cache miss.
///
/// Called at most once per concurrently-missing key per node: the group's
/// single-flight loader coalesces concurrent misses before `get` is called.
pub trait Getter: Send + Sync {
    fn get(&self, key: &str) -> Result<Vec<u8>, BoxError>;
}

impl<F> Getter for F
where
    F: Fn(&str) -> Result<Vec<u8>, BoxError> + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Vec<u8>, BoxError> {
        self(key)
    }
}

/// Fetches a value from a specific remote peer.
pub trait PeerGetter: Send + Sync {
    fn get(&self, group: &str, key: &str) -> Result<Vec<u8>, BoxError>;
}

/// Routes a key to the peer that owns it.
///
/// Returning `None` means "handle locally" — including, by convention, when
/// the picker resolves the key to the local node itself (to avoid a
/// self-referential network round trip).
pub trait PeerPicker: Send + Sync {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

/// A wrapper that lets the single-flight table's type-erased error carry a
/// `GcacheError` `#[source]` without requiring `GcacheError: Clone`.
#[derive(Debug)]
struct SharedFailure(Arc<dyn std::error::Error + Send + Sync>);

impl fmt::Display for SharedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for SharedFailure {}

/// A named cache namespace: its own capacity, backing getter, and peer
/// picker.
pub struct Group {
    name: String,
    getter: Arc<dyn Getter>,
    store: ShardedStore,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    loader: SingleFlight<ByteView>,
}

impl Group {
    /// Constructs a group. `capacity_bytes == 0` means unlimited, matching
    /// the underlying LRU.
    ///
    /// There is no "nil getter" case to guard against here (unlike
    /// groupcache, which panics on one at construction): `getter` is a
    /// required, non-optional parameter, so the type system rules it out
    /// instead of a runtime check.
    pub fn new(name: impl Into<String>, capacity_bytes: usize, getter: Arc<dyn Getter>) -> Self {
        let name = name.into();
        tracing::info!(group = %name, capacity_bytes, "group created");
        Group {
            name,
            getter,
            store: ShardedStore::new(capacity_bytes),
            peers: OnceLock::new(),
            loader: SingleFlight::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of entries currently resident in this group's local store.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Sets the peer picker. Must be called at most once; a second call
    /// panics, mirroring the "double `RegisterPeer` is a programming error"
    /// rule.
    pub fn register_peer(&self, peers: Arc<dyn PeerPicker>) {
        if self.peers.set(peers).is_err() {
            panic!("peer picker already registered for group {:?}", self.name);
        }
        tracing::info!(group = %self.name, "peer picker registered");
    }

    /// Fetches `key`: local cache hit, else a single-flight load that tries
    /// the owning peer (if one is registered and not local) before falling
    /// back to the backing getter.
    pub fn get(&self, key: &str) -> GcacheResult<ByteView> {
        if key.is_empty() {
            return Err(GcacheError::KeyRequired);
        }
        if let Some(value) = self.store.get(key) {
            return Ok(value);
        }
        self.load(key)
    }

    fn load(&self, key: &str) -> GcacheResult<ByteView> {
        self.loader
            .do_call::<BoxError, _>(key, || self.load_once(key))
            .map_err(|err| GcacheError::LoaderFailed {
                key: key.to_string(),
                source: Box::new(SharedFailure(err)),
            })
    }

    fn load_once(&self, key: &str) -> Result<ByteView, BoxError> {
        if let Some(picker) = self.peers.get() {
            if let Some(peer) = picker.pick_peer(key) {
                match peer.get(&self.name, key) {
                    Ok(bytes) => {
                        // Peer owns this key; cache only on the owning node.
                        return Ok(ByteView::copy_from(&bytes));
                    }
                    Err(err) => {
                        tracing::warn!(
                            group = %self.name,
                            key = %key,
                            error = %err,
                            "peer fetch failed, falling back to local load"
                        );
                    }
                }
            }
        }

        let bytes = self.getter.get(key)?;
        let value = ByteView::copy_from(&bytes);
        self.store.add(key.to_string(), value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scores_getter() -> Arc<dyn Getter> {
        Arc::new(|key: &str| -> Result<Vec<u8>, BoxError> {
            match key {
                "Tom" => Ok(b"630".to_vec()),
                "Jack" => Ok(b"589".to_vec()),
                "Sam" => Ok(b"567".to_vec()),
                other => Err(Box::new(gcache_common::error::StringError(format!(
                    "{other} not exist"
                )))),
            }
        })
    }

    #[test]
    fn get_with_empty_key_fails() {
        let group = Group::new("scores", 2048, scores_getter());
        assert!(matches!(group.get(""), Err(GcacheError::KeyRequired)));
    }

    #[test]
    fn get_loads_then_hits_cache() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let counted = call_count.clone();
        let getter: Arc<dyn Getter> = Arc::new(move |key: &str| -> Result<Vec<u8>, BoxError> {
            counted.fetch_add(1, Ordering::SeqCst);
            match key {
                "Tom" => Ok(b"630".to_vec()),
                other => Err(Box::new(gcache_common::error::StringError(format!(
                    "{other} not exist"
                )))),
            }
        });
        let group = Group::new("scores", 2048, getter);

        let first = group.get("Tom").unwrap();
        assert_eq!(first.bytes(), b"630");
        let second = group.get("Tom").unwrap();
        assert_eq!(second.bytes(), b"630");
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_on_unknown_key_propagates_the_getters_cause() {
        let group = Group::new("scores", 2048, scores_getter());
        let err = group.get("unknown").unwrap_err();
        assert!(err.root_cause_message().contains("unknown not exist"));
    }

    struct StaticPeer {
        group: &'static str,
        response: &'static str,
    }

    impl PeerGetter for StaticPeer {
        fn get(&self, group: &str, _key: &str) -> Result<Vec<u8>, BoxError> {
            assert_eq!(group, self.group);
            Ok(self.response.as_bytes().to_vec())
        }
    }

    struct AlwaysRoutes(Arc<dyn PeerGetter>);

    impl PeerPicker for AlwaysRoutes {
        fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerGetter>> {
            Some(self.0.clone())
        }
    }

    struct AlwaysFails;

    impl PeerGetter for AlwaysFails {
        fn get(&self, _group: &str, _key: &str) -> Result<Vec<u8>, BoxError> {
            Err(Box::new(gcache_common::error::StringError(
                "peer unreachable".to_string(),
            )))
        }
    }

    #[test]
    fn routes_to_peer_and_does_not_populate_local_store() {
        let group = Group::new("scores", 2048, scores_getter());
        group.register_peer(Arc::new(AlwaysRoutes(Arc::new(StaticPeer {
            group: "scores",
            response: "999",
        }))));

        let value = group.get("Tom").unwrap();
        assert_eq!(value.bytes(), b"999");
        assert_eq!(group.len(), 0, "peer result must not be cached locally");
    }

    #[test]
    fn falls_back_to_local_getter_when_the_peer_fails() {
        let group = Group::new("scores", 2048, scores_getter());
        group.register_peer(Arc::new(AlwaysRoutes(Arc::new(AlwaysFails))));

        let value = group.get("Tom").unwrap();
        assert_eq!(value.bytes(), b"630");
        assert_eq!(group.len(), 1, "local fallback must populate the store");
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registering_a_peer_picker_twice_panics() {
        let group = Group::new("scores", 2048, scores_getter());
        group.register_peer(Arc::new(AlwaysRoutes(Arc::new(AlwaysFails))));
        group.register_peer(Arc::new(AlwaysRoutes(Arc::new(AlwaysFails))));
    }
}
