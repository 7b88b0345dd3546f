//! # Peer Wire Protocol
//!
//! Purpose: parse and write just enough of HTTP/1.1 to carry the peer
//! protocol described in the core design — a `GET` for a group/key pair,
//! answered with raw bytes or a status-only error. Not a general-purpose
//! HTTP implementation: no chunked transfer-encoding, no keep-alive, no
//! header folding.
//!
//! ## Design Principles
//! 1. **One Request Per Connection**: the server reads one request, writes
//!    one response, and closes. Simpler than connection reuse and adequate
//!    for a fixed, trusted peer set.
//! 2. **Binary-Safe Bodies**: response bodies are raw bytes, framed by
//!    `Content-Length`, never text-encoded.
//! 3. **Fail Fast**: a malformed request line or path is a `400`, not a
//!    panic — the only panic this crate allows is a path outside
//!    `basePath`, which is a local configuration error, not an input one,
//!    and is caught at picker construction instead (see `peer.rs`).

use std::fmt;

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Default peer base path, per the core design's external interface.
pub const DEFAULT_BASE_PATH: &str = "/gcache/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ProtocolError {
    Eof,
    Malformed,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Eof => f.write_str("connection closed before a request was read"),
            ProtocolError::Malformed => f.write_str("malformed HTTP request line"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Reads one request line and its headers (discarded) from `reader`.
///
/// Returns `Err(ProtocolError::Eof)` if the connection closed before any
/// bytes were read, so callers can distinguish "client hung up cleanly"
/// from "sent garbage".
pub async fn read_request(reader: &mut (impl AsyncBufReadExt + Unpin)) -> Result<Request, ProtocolError> {
    let mut line = String::new();
    let bytes = reader.read_line(&mut line).await.map_err(|_| ProtocolError::Malformed)?;
    if bytes == 0 {
        return Err(ProtocolError::Eof);
    }
    let request = parse_request_line(line.trim_end())?;

    // Drain headers up to the blank line; their content is not needed for
    // this protocol (no request body, no content negotiation).
    loop {
        let mut header_line = String::new();
        let bytes = reader
            .read_line(&mut header_line)
            .await
            .map_err(|_| ProtocolError::Malformed)?;
        if bytes == 0 || header_line.trim_end().is_empty() {
            break;
        }
    }

    Ok(request)
}

fn parse_request_line(line: &str) -> Result<Request, ProtocolError> {
    let mut parts = line.split(' ');
    let method = parts.next().ok_or(ProtocolError::Malformed)?;
    let path = parts.next().ok_or(ProtocolError::Malformed)?;
    let _version = parts.next().ok_or(ProtocolError::Malformed)?;

    let method = if method.eq_ignore_ascii_case("GET") {
        Method::Get
    } else {
        Method::Other
    };

    Ok(Request {
        method,
        path: path.to_string(),
    })
}

/// An HTTP response: status line, one `Content-Type` header, and a raw
/// binary body framed by `Content-Length`.
pub struct Response {
    pub status: u16,
    pub reason: &'static str,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok_octet_stream(body: Vec<u8>) -> Self {
        Response {
            status: 200,
            reason: "OK",
            content_type: "application/octet-stream",
            body,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Response {
            status: 404,
            reason: "Not Found",
            content_type: "text/plain; charset=utf-8",
            body: message.into().into_bytes(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Response {
            status: 400,
            reason: "Bad Request",
            content_type: "text/plain; charset=utf-8",
            body: message.into().into_bytes(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Response {
            status: 500,
            reason: "Internal Server Error",
            content_type: "text/plain; charset=utf-8",
            body: message.into().into_bytes(),
        }
    }
}

pub async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> std::io::Result<()> {
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.reason,
        response.content_type,
        response.body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&response.body).await?;
    writer.flush().await
}

/// Splits a request path of the form `{basePath}{group}/{key}` into its two
/// URL-decoded segments.
pub fn parse_peer_path(path: &str, base_path: &str) -> Result<(String, String), ProtocolError> {
    let rest = path.strip_prefix(base_path).ok_or(ProtocolError::Malformed)?;
    let mut segments = rest.splitn(2, '/');
    let group = segments.next().filter(|s| !s.is_empty()).ok_or(ProtocolError::Malformed)?;
    let key = segments.next().filter(|s| !s.is_empty()).ok_or(ProtocolError::Malformed)?;
    let group = percent_decode(group).map_err(|_| ProtocolError::Malformed)?;
    let key = percent_decode(key).map_err(|_| ProtocolError::Malformed)?;
    Ok((group, key))
}

/// Builds the request path for a peer URL: `{basePath}{group}/{key}`, with
/// `group` and `key` percent-encoded as path segments.
pub fn build_peer_path(base_path: &str, group: &str, key: &str) -> String {
    format!("{base_path}{}/{}", percent_encode(group), percent_encode(key))
}

fn percent_encode(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn percent_decode(segment: &str) -> Result<String, ProtocolError> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3).ok_or(ProtocolError::Malformed)?;
                let hex = std::str::from_utf8(hex).map_err(|_| ProtocolError::Malformed)?;
                let value = u8::from_str_radix(hex, 16).map_err(|_| ProtocolError::Malformed)?;
                out.push(value);
                i += 3;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| ProtocolError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_a_get_request_line_and_skips_headers() {
        let raw = b"GET /gcache/scores/Tom HTTP/1.1\r\nHost: peer\r\n\r\n".to_vec();
        let mut reader = tokio::io::BufReader::new(std::io::Cursor::new(raw));
        let request = read_request(&mut reader).await.unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, "/gcache/scores/Tom");
    }

    #[tokio::test]
    async fn empty_connection_reports_eof() {
        let raw: Vec<u8> = Vec::new();
        let mut reader = tokio::io::BufReader::new(std::io::Cursor::new(raw));
        let err = read_request(&mut reader).await.unwrap_err();
        assert_eq!(err, ProtocolError::Eof);
    }

    #[test]
    fn parses_group_and_key_from_the_default_base_path() {
        let (group, key) = parse_peer_path("/gcache/scores/Tom", DEFAULT_BASE_PATH).unwrap();
        assert_eq!(group, "scores");
        assert_eq!(key, "Tom");
    }

    #[test]
    fn round_trips_percent_encoded_segments() {
        let path = build_peer_path(DEFAULT_BASE_PATH, "sco res", "a/b");
        let (group, key) = parse_peer_path(&path, DEFAULT_BASE_PATH).unwrap();
        assert_eq!(group, "sco res");
        assert_eq!(key, "a/b");
    }

    #[test]
    fn rejects_a_path_outside_the_base_path() {
        assert!(parse_peer_path("/other/scores/Tom", DEFAULT_BASE_PATH).is_err());
    }

    #[test]
    fn rejects_a_path_missing_the_key_segment() {
        assert!(parse_peer_path("/gcache/scores", DEFAULT_BASE_PATH).is_err());
    }
}
