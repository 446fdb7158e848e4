//! Tunables shared by the protocol adapter and the session driver.

/// Default maximum accepted payload length (16 MiB).
pub const DEFAULT_MAX_PAYLOAD_LEN: u64 = 16 * 1024 * 1024;

/// Default size of each read from the transport (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8192;

/// Default initial capacity of a connection byte cache (16 KiB).
pub const DEFAULT_CACHE_CAPACITY: usize = 16384;

/// Configuration for a [`WebSocketProtocol`](crate::WebSocketProtocol) and
/// the [`Session`](crate::Session) that drives it.
///
/// ```
/// use ws_protocol::WebSocketConfig;
///
/// let config = WebSocketConfig::default()
///     .with_max_payload_len(1024)
///     .with_read_buffer_size(4096);
/// assert_eq!(config.max_payload_len(), 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebSocketConfig {
    max_payload_len: u64,
    read_buffer_size: usize,
    cache_capacity: usize,
}

impl WebSocketConfig {
    /// Create a configuration with the default limits.
    pub fn new() -> Self {
        Self {
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Reject inbound frames whose payload is longer than `len` bytes.
    pub fn with_max_payload_len(mut self, len: u64) -> Self {
        self.max_payload_len = len;
        self
    }

    /// Read at most `size` bytes from the transport per read call.
    /// A size of zero is raised to one.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Preallocate `capacity` bytes for each connection byte cache.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Maximum accepted inbound payload length
    pub fn max_payload_len(&self) -> u64 {
        self.max_payload_len
    }

    /// Bytes requested from the transport per read
    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    /// Initial connection cache capacity
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self::new()
    }
}
