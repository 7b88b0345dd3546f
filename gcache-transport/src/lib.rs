//! Wire transport for peer-to-peer cache fetches: a minimal HTTP/1.1
//! request/response codec, an async server, a blocking connection pool, and
//! the `PeerPicker`/`PeerGetter` pair that wires them into `gcache-core`.

pub mod config;
pub mod peer;
pub mod pool;
pub mod protocol;
pub mod server;

pub use config::{ConfigError, GroupConfig, NodeConfig, PeerConfig};
pub use peer::{HttpPeerGetter, HttpPeerPicker};
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};
pub use protocol::{Method, ProtocolError, Request, Response, DEFAULT_BASE_PATH};
pub use server::PeerServer;
