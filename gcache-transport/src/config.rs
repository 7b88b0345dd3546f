//! # Node Configuration
//!
//! The small, serializable struct that parameterizes one process: its listen
//! address, its peer set, and the cache/ring knobs each registered group is
//! built with. The core itself takes these as constructor arguments and
//! knows nothing about files or environment variables; this struct is the
//! ambient layer that turns a config file into those arguments.
//!
//! ## Design Principles
//! 1. **Plain Data, No Behavior**: `NodeConfig` has no methods that touch the
//!    network or the registry; wiring it up is the caller's job.
//! 2. **JSON, Not Flags**: command-line parsing is out of scope for this
//!    crate; a config file (or an embedded literal, in tests) is the only
//!    supported source.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::protocol::DEFAULT_BASE_PATH;

/// One peer's routing identity: the id it is addressed by on the consistent
/// hash ring, and the `host:port` its connection pool dials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub id: String,
    pub addr: String,
}

/// One cache namespace's capacity, independent of the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    /// Byte budget passed straight to `Group::new`; `0` means unlimited.
    #[serde(default)]
    pub capacity_bytes: usize,
}

/// Everything needed to wire up one node of the cluster: who it is, who its
/// peers are, which groups it serves, and the ring's replica count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's own peer id, used to detect self-routing.
    pub self_id: String,
    /// Address this node's peer server binds and listens on.
    pub listen_addr: String,
    /// The full peer set, including this node's own entry.
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    /// Groups this node serves locally.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    /// Virtual-node multiplier for the consistent-hash ring.
    #[serde(default = "default_replicas")]
    pub replicas: usize,
    /// Path prefix for peer requests, e.g. `/gcache/`.
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

fn default_replicas() -> usize {
    50
}

fn default_base_path() -> String {
    DEFAULT_BASE_PATH.to_string()
}

/// A malformed or unreadable config file.
#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(err) => write!(f, "failed to read config file: {err}"),
            ConfigError::Parse(err) => write!(f, "failed to parse config file: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
        }
    }
}

impl NodeConfig {
    /// Parses a `NodeConfig` from a JSON string, e.g. a config file's
    /// contents already read into memory.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Parse)
    }

    /// Reads and parses a `NodeConfig` from a JSON file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::from_json(&text).map_err(|err| anyhow::anyhow!("{}: {err}", path.display()))
    }

    /// The peer set minus this node's own entry, as `(id, addr)` pairs ready
    /// for `HttpPeerPicker::set_peers`.
    pub fn remote_peers(&self) -> Vec<(String, String)> {
        self.peers
            .iter()
            .filter(|p| p.id != self.self_id)
            .map(|p| (p.id.clone(), p.addr.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_config_from_json() {
        let text = r#"{
            "self_id": "8001",
            "listen_addr": "127.0.0.1:8001",
            "peers": [
                {"id": "8001", "addr": "127.0.0.1:8001"},
                {"id": "8002", "addr": "127.0.0.1:8002"}
            ],
            "groups": [
                {"name": "scores", "capacity_bytes": 2048}
            ],
            "replicas": 50
        }"#;

        let config = NodeConfig::from_json(text).expect("valid config");
        assert_eq!(config.self_id, "8001");
        assert_eq!(config.groups[0].name, "scores");
        assert_eq!(config.base_path, DEFAULT_BASE_PATH);
    }

    #[test]
    fn replicas_and_base_path_default_when_omitted() {
        let text = r#"{"self_id": "a", "listen_addr": "127.0.0.1:0"}"#;
        let config = NodeConfig::from_json(text).expect("defaults fill in");
        assert_eq!(config.replicas, 50);
        assert_eq!(config.base_path, "/gcache/");
        assert!(config.peers.is_empty());
        assert!(config.groups.is_empty());
    }

    #[test]
    fn remote_peers_excludes_self() {
        let config = NodeConfig {
            self_id: "8001".to_string(),
            listen_addr: "127.0.0.1:8001".to_string(),
            peers: vec![
                PeerConfig { id: "8001".to_string(), addr: "127.0.0.1:8001".to_string() },
                PeerConfig { id: "8002".to_string(), addr: "127.0.0.1:8002".to_string() },
            ],
            groups: vec![],
            replicas: 50,
            base_path: DEFAULT_BASE_PATH.to_string(),
        };

        let remote = config.remote_peers();
        assert_eq!(remote, vec![("8002".to_string(), "127.0.0.1:8002".to_string())]);
    }

    #[test]
    fn malformed_json_is_reported_as_a_parse_error() {
        let err = NodeConfig::from_json("{not json}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
