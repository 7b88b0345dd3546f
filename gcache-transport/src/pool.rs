//! # Peer Connection Pool
//!
//! A small blocking connection pool for the peer HTTP client, matching the
//! shape of the core design's synchronous `PeerGetter` interface: no async
//! runtime is needed on the calling side just to fetch one value from one
//! peer.
//!
//! Uses `std::sync::Mutex` rather than `parking_lot` here, deliberately: this
//! module is a thin, rarely-contended pool guard, not a hot-path lock.

use std::collections::VecDeque;
use std::io::{BufReader, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub addr: String,
    pub max_idle: usize,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            addr: String::new(),
            max_idle: 8,
            connect_timeout: Some(Duration::from_secs(2)),
            read_timeout: Some(Duration::from_secs(2)),
            write_timeout: Some(Duration::from_secs(2)),
        }
    }
}

pub struct Connection {
    pub reader: BufReader<TcpStream>,
    pub writer: TcpStream,
}

struct PoolState {
    idle: VecDeque<Connection>,
}

struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
}

/// A pool of connections to one peer address.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub fn new(config: PoolConfig) -> Self {
        ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(PoolState {
                    idle: VecDeque::new(),
                }),
            }),
        }
    }

    /// Takes an idle connection if one exists, otherwise dials a fresh one.
    pub fn acquire(&self) -> std::io::Result<PooledConnection<'_>> {
        let mut state = self.inner.state.lock().unwrap();
        let conn = match state.idle.pop_front() {
            Some(conn) => conn,
            None => {
                drop(state);
                self.connect()?
            }
        };
        Ok(PooledConnection {
            pool: self,
            conn: Some(conn),
        })
    }

    fn connect(&self) -> std::io::Result<Connection> {
        let config = &self.inner.config;
        let stream = match config.connect_timeout {
            Some(timeout) => {
                let addr = config
                    .addr
                    .parse()
                    .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid peer address"))?;
                TcpStream::connect_timeout(&addr, timeout)?
            }
            None => TcpStream::connect(&config.addr)?,
        };
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        let writer = stream.try_clone()?;
        Ok(Connection {
            reader: BufReader::new(stream),
            writer,
        })
    }

    fn release(&self, conn: Connection) {
        let mut state = self.inner.state.lock().unwrap();
        if state.idle.len() < self.inner.config.max_idle {
            state.idle.push_back(conn);
        }
    }
}

/// RAII guard: returns its connection to the pool on drop, unless the
/// connection was explicitly discarded (e.g. after a protocol error).
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl<'a> PooledConnection<'a> {
    pub fn connection(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until dropped")
    }

    /// Drops the connection instead of returning it to the pool. Call this
    /// after an I/O or protocol error so a dead socket is not reused.
    pub fn discard(mut self) {
        self.conn = None;
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

impl Connection {
    pub fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()
    }
}
