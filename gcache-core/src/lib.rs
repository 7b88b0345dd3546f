//! # gcache-core
//!
//! The tightly-coupled subsystems that make a distributed, cluster-sharded
//! LRU cache correct under concurrency: a bounded byte-accounted LRU, a
//! consistent-hash ring for peer ownership, a single-flight loader, and the
//! `Group` façade that composes them into the cache-aside / peer-redirect
//! protocol.
//!
//! The HTTP transport that carries peer requests on the wire lives in
//! `gcache-transport`; this crate only defines the `Getter`/`PeerPicker`/
//! `PeerGetter` traits that transport implements against.

pub mod group;
pub mod lru;
pub mod registry;
pub mod ring;
pub mod singleflight;
pub mod store;

pub use gcache_common::{ByteView, GcacheError, GcacheResult};
pub use group::{Getter, Group, PeerGetter, PeerPicker};
pub use lru::LruCache;
pub use registry::GroupRegistry;
pub use ring::{Ring, RingError};
pub use singleflight::SingleFlight;
pub use store::ShardedStore;
