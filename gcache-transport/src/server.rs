//! # Peer HTTP Server
//!
//! Accepts connections, parses one peer request per connection, and
//! dispatches to a `GroupRegistry`, returning the status codes the core
//! design's external-interface section assigns to each outcome.

use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

use gcache_core::GroupRegistry;

use crate::protocol::{self, Method, Request, Response, DEFAULT_BASE_PATH};

/// Serves the peer protocol over a bound `TcpListener`, dispatching against
/// `registry`. Each accepted connection is handled on its own task; a
/// connection-level error is logged and does not affect other connections.
pub struct PeerServer {
    registry: Arc<GroupRegistry>,
    base_path: String,
}

impl PeerServer {
    pub fn new(registry: Arc<GroupRegistry>) -> Self {
        PeerServer::with_base_path(registry, DEFAULT_BASE_PATH)
    }

    pub fn with_base_path(registry: Arc<GroupRegistry>, base_path: impl Into<String>) -> Self {
        PeerServer {
            registry,
            base_path: base_path.into(),
        }
    }

    /// Runs the accept loop until the listener errors or is dropped.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (stream, peer_addr) = listener.accept().await?;
            let registry = self.registry.clone();
            let base_path = self.base_path.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, &registry, &base_path).await {
                    tracing::warn!(%peer_addr, error = %err, "peer connection ended with an error");
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    registry: &GroupRegistry,
    base_path: &str,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let response = match protocol::read_request(&mut reader).await {
        Ok(request) => dispatch(&request, registry, base_path),
        Err(protocol::ProtocolError::Eof) => return Ok(()),
        Err(protocol::ProtocolError::Malformed) => Response::bad_request("malformed request line"),
    };

    if response.status >= 400 {
        tracing::warn!(status = response.status, "peer request rejected");
    }
    protocol::write_response(&mut write_half, &response).await
}

fn dispatch(request: &Request, registry: &GroupRegistry, base_path: &str) -> Response {
    if request.method != Method::Get {
        return Response::bad_request("only GET is supported");
    }

    let (group_name, key) = match protocol::parse_peer_path(&request.path, base_path) {
        Ok(pair) => pair,
        Err(_) => return Response::bad_request("malformed path"),
    };

    let Some(group) = registry.get_group(&group_name) else {
        return Response::not_found(format!("no group named {group_name:?}"));
    };

    match group.get(&key) {
        Ok(value) => Response::ok_octet_stream(value.bytes().to_vec()),
        Err(err) => {
            tracing::warn!(group = %group_name, key = %key, error = %err, "loader failed for peer request");
            Response::internal_error(err.root_cause_message())
        }
    }
}
