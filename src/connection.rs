//! The connection collaborator and an in-memory implementation of it.

use bytes::{Buf, Bytes, BytesMut};
use std::net::SocketAddr;

use crate::config::DEFAULT_CACHE_CAPACITY;

/// The transport-side view of one client connection.
///
/// The host owns buffering and socket I/O. A protocol only writes outbound
/// bytes and reads, then releases, the bytes buffered for the frame in
/// progress.
pub trait Connection {
    /// Queue `bytes` for transmission. Returns false if the write failed.
    fn write(&mut self, bytes: &[u8]) -> bool;

    /// Bytes received and not yet consumed.
    fn cache(&self) -> &[u8];

    /// Discard every buffered byte.
    fn clean_cache(&mut self);

    /// Discard the first `len` buffered bytes, keeping the rest for the next
    /// frame. Consuming the whole cache is equivalent to
    /// [`clean_cache`](Connection::clean_cache).
    fn consume_cache(&mut self, len: usize);
}

/// Socket information for a connection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SocketInfo {
    /// Local socket address
    pub local: Option<SocketAddr>,
    /// Remote socket address
    pub remote: Option<SocketAddr>,
}

impl SocketInfo {
    /// Create a new SocketInfo with both local and remote addresses
    pub fn new(local: Option<SocketAddr>, remote: Option<SocketAddr>) -> Self {
        Self { local, remote }
    }
}

/// A [`Connection`] backed by two in-memory buffers.
///
/// Received bytes are appended with [`receive`](BufferedConnection::receive);
/// protocol writes accumulate until the host collects them with
/// [`take_outbound`](BufferedConnection::take_outbound). Writes fail once the
/// connection is closed.
#[derive(Debug)]
pub struct BufferedConnection {
    cache: BytesMut,
    outbound: BytesMut,
    socket_info: SocketInfo,
    closed: bool,
}

impl BufferedConnection {
    /// Create a connection with a cache preallocated to `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: BytesMut::with_capacity(capacity),
            outbound: BytesMut::new(),
            socket_info: SocketInfo::default(),
            closed: false,
        }
    }

    /// Create a connection with the default cache capacity (16KB)
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Attach the addresses the host bound this connection to
    pub fn with_socket_info(mut self, info: SocketInfo) -> Self {
        self.socket_info = info;
        self
    }

    /// Addresses of the underlying transport
    pub fn socket_info(&self) -> &SocketInfo {
        &self.socket_info
    }

    /// Append bytes read from the transport to the cache
    pub fn receive(&mut self, data: &[u8]) {
        self.cache.extend_from_slice(data);
    }

    /// Take every byte written since the last call
    pub fn take_outbound(&mut self) -> Bytes {
        self.outbound.split().freeze()
    }

    /// Check whether writes are waiting to be flushed
    pub fn has_outbound(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Refuse further writes
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Check whether the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Default for BufferedConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection for BufferedConnection {
    fn write(&mut self, bytes: &[u8]) -> bool {
        if self.closed {
            return false;
        }
        self.outbound.extend_from_slice(bytes);
        true
    }

    fn cache(&self) -> &[u8] {
        &self.cache
    }

    fn clean_cache(&mut self) {
        self.cache.clear();
    }

    fn consume_cache(&mut self, len: usize) {
        if len >= self.cache.len() {
            self.cache.clear();
        } else {
            self.cache.advance(len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_write_and_take_outbound() {
        let mut conn = BufferedConnection::new();
        assert!(!conn.has_outbound());

        assert!(conn.write(b"abc"));
        assert!(conn.write(b"def"));
        assert!(conn.has_outbound());
        assert_eq!(&conn.take_outbound()[..], b"abcdef");
        assert!(conn.take_outbound().is_empty());
    }

    #[test]
    fn test_write_after_close_fails() {
        let mut conn = BufferedConnection::new();
        conn.close();
        assert!(conn.is_closed());
        assert!(!conn.write(b"late"));
        assert!(!conn.has_outbound());
    }

    #[test]
    fn test_cache_consumption() {
        let mut conn = BufferedConnection::with_capacity(4);
        conn.receive(b"hello");
        conn.receive(b" world");
        assert_eq!(conn.cache(), b"hello world");

        conn.consume_cache(6);
        assert_eq!(conn.cache(), b"world");

        conn.consume_cache(100);
        assert!(conn.cache().is_empty());

        conn.receive(b"again");
        conn.clean_cache();
        assert!(conn.cache().is_empty());
    }

    #[test]
    fn test_socket_info() {
        let local = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8001);
        let remote = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)), 5000);

        let conn =
            BufferedConnection::new().with_socket_info(SocketInfo::new(Some(local), Some(remote)));
        assert_eq!(conn.socket_info().local, Some(local));
        assert_eq!(conn.socket_info().remote, Some(remote));
    }
}
