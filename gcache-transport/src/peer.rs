//! # HTTP Peer Picker and Getter
//!
//! The default `PeerPicker`/`PeerGetter` pair: routes a key to its owning
//! peer via a consistent-hash ring, and fetches it over the wire protocol
//! defined in `protocol.rs`.

use std::io::{BufRead, Read};
use std::sync::Arc;

use parking_lot::RwLock;

use gcache_common::error::{BoxError, StringError};
use gcache_core::{PeerGetter, PeerPicker, Ring};

use crate::pool::{ConnectionPool, PoolConfig};
use crate::protocol::{build_peer_path, DEFAULT_BASE_PATH};

/// Fetches a value from one specific peer over the peer wire protocol.
pub struct HttpPeerGetter {
    pool: ConnectionPool,
    host_header: String,
    base_path: String,
}

impl HttpPeerGetter {
    pub fn new(addr: impl Into<String>, base_path: impl Into<String>) -> Self {
        let addr = addr.into();
        HttpPeerGetter {
            host_header: addr.clone(),
            pool: ConnectionPool::new(PoolConfig {
                addr,
                ..PoolConfig::default()
            }),
            base_path: base_path.into(),
        }
    }
}

impl PeerGetter for HttpPeerGetter {
    fn get(&self, group: &str, key: &str) -> Result<Vec<u8>, BoxError> {
        let path = build_peer_path(&self.base_path, group, key);
        let mut guard = self.pool.acquire().map_err(|e| Box::new(e) as BoxError)?;
        let conn = guard.connection();

        let request = format!(
            "GET {path} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            self.host_header
        );
        conn.write_all(request.as_bytes())
            .map_err(|e| Box::new(e) as BoxError)?;

        let status = read_status_line(&mut conn.reader).map_err(|e| Box::new(e) as BoxError)?;
        let content_length = read_headers_for_content_length(&mut conn.reader).map_err(|e| Box::new(e) as BoxError)?;

        let mut body = vec![0u8; content_length];
        conn.reader
            .read_exact(&mut body)
            .map_err(|e| Box::new(e) as BoxError)?;

        match status {
            200 => Ok(body),
            404 => Err(Box::new(StringError(format!(
                "peer has no group {group:?}"
            )))),
            other => Err(Box::new(StringError(format!(
                "peer returned status {other}: {}",
                String::from_utf8_lossy(&body)
            )))),
        }
    }
}

fn read_status_line(reader: &mut impl BufRead) -> std::io::Result<u16> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let status = line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed status line"))?;
    Ok(status)
}

fn read_headers_for_content_length(reader: &mut impl BufRead) -> std::io::Result<usize> {
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    Ok(content_length)
}

/// Routes keys to peers via a consistent-hash ring, and answers `None`
/// (handle locally) whenever the ring picks the local node itself, to avoid
/// an HTTP round trip to the process's own server.
pub struct HttpPeerPicker {
    self_id: String,
    base_path: String,
    replicas: usize,
    ring: RwLock<Ring>,
    getters: RwLock<hashbrown::HashMap<String, Arc<HttpPeerGetter>>>,
}

impl HttpPeerPicker {
    pub fn new(self_id: impl Into<String>, replicas: usize) -> Self {
        HttpPeerPicker::with_base_path(self_id, replicas, DEFAULT_BASE_PATH)
    }

    pub fn with_base_path(self_id: impl Into<String>, replicas: usize, base_path: impl Into<String>) -> Self {
        HttpPeerPicker {
            self_id: self_id.into(),
            base_path: base_path.into(),
            replicas,
            ring: RwLock::new(Ring::new(replicas, None)),
            getters: RwLock::new(hashbrown::HashMap::new()),
        }
    }

    /// Rebuilds the ring and getter table wholesale from the current peer
    /// set. Peer-set changes are rare operational events, so a full rebuild
    /// under one write lock is preferred over incremental, finer-grained
    /// updates.
    ///
    /// `peers` maps peer id (as used on the ring) to its `host:port` address.
    pub fn set_peers(&self, peers: &[(String, String)]) {
        let mut ring = Ring::new(self.replicas, None);
        let ids: Vec<&str> = peers.iter().map(|(id, _)| id.as_str()).collect();
        if !ids.is_empty() {
            ring.add(&ids).expect("peer ids are unique within one set_peers call");
        }

        let mut getters = hashbrown::HashMap::new();
        for (id, addr) in peers {
            getters.insert(id.clone(), Arc::new(HttpPeerGetter::new(addr.clone(), self.base_path.clone())));
        }

        *self.ring.write() = ring;
        *self.getters.write() = getters;
    }
}

impl PeerPicker for HttpPeerPicker {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let owner = {
            let ring = self.ring.read();
            ring.get(key)?.to_string()
        };
        if owner == self.self_id {
            return None;
        }
        self.getters
            .read()
            .get(&owner)
            .cloned()
            .map(|getter| getter as Arc<dyn PeerGetter>)
    }
}
