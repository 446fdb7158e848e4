//! WebSocket frame types conforming to RFC 6455.

use bytes::Bytes;
use std::fmt;

/// WebSocket opcodes as defined in RFC 6455 Section 5.2.
///
/// Every 4-bit value is representable: values without an RFC 6455 meaning
/// are carried as [`WebSocketOpcode::Reserved`] so the codec can honor them
/// without interpreting them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WebSocketOpcode {
    /// Continuation frame (0x0)
    Continuation,
    /// Text data frame (0x1)
    #[default]
    Text,
    /// Binary data frame (0x2)
    Binary,
    /// Connection close frame (0x8)
    Close,
    /// Ping frame (0x9)
    Ping,
    /// Pong frame (0xA)
    Pong,
    /// Any other 4-bit opcode (0x3-0x7, 0xB-0xF)
    Reserved(u8),
}

impl WebSocketOpcode {
    /// Build an opcode from the low nibble of `value`.
    pub fn from_bits(value: u8) -> Self {
        match value & 0x0F {
            0x0 => WebSocketOpcode::Continuation,
            0x1 => WebSocketOpcode::Text,
            0x2 => WebSocketOpcode::Binary,
            0x8 => WebSocketOpcode::Close,
            0x9 => WebSocketOpcode::Ping,
            0xA => WebSocketOpcode::Pong,
            other => WebSocketOpcode::Reserved(other),
        }
    }

    /// The 4-bit wire value of this opcode.
    pub fn as_u8(&self) -> u8 {
        match self {
            WebSocketOpcode::Continuation => 0x0,
            WebSocketOpcode::Text => 0x1,
            WebSocketOpcode::Binary => 0x2,
            WebSocketOpcode::Close => 0x8,
            WebSocketOpcode::Ping => 0x9,
            WebSocketOpcode::Pong => 0xA,
            WebSocketOpcode::Reserved(value) => value & 0x0F,
        }
    }

    /// Check if this is a control frame opcode.
    pub fn is_control(&self) -> bool {
        self.as_u8() & 0x08 != 0
    }

    /// Check if this is a data frame opcode.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            WebSocketOpcode::Text | WebSocketOpcode::Binary | WebSocketOpcode::Continuation
        )
    }
}

impl From<u8> for WebSocketOpcode {
    fn from(value: u8) -> Self {
        Self::from_bits(value)
    }
}

/// A single decoded WebSocket frame.
///
/// Frames are built fresh for every decode call and never mutated
/// afterwards. `payload` always holds the unmasked bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketFrame {
    /// FIN bit: indicates this is the final fragment of a message
    pub fin: bool,
    /// RSV1-3 bits, right-aligned (`0b0000_0rrr`). Read but not validated.
    pub rsv: u8,
    /// Opcode: identifies the frame type
    pub opcode: WebSocketOpcode,
    /// Mask bit as it appeared on the wire
    pub masked: bool,
    /// Masking key, present iff `masked`
    pub masking_key: Option<[u8; 4]>,
    /// Unmasked payload data
    pub payload: Bytes,
}

impl WebSocketFrame {
    /// Length of the unmasked payload in bytes.
    pub fn payload_len(&self) -> u64 {
        self.payload.len() as u64
    }

    /// Check if this is a text frame.
    pub fn is_text(&self) -> bool {
        self.opcode == WebSocketOpcode::Text
    }

    /// Get the payload as a UTF-8 text string.
    /// Returns None if the frame is not a text frame or contains invalid UTF-8.
    pub fn payload_as_text(&self) -> Option<&str> {
        if !self.is_text() {
            return None;
        }
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Apply XOR mask to payload data per RFC 6455 Section 5.3.
///
/// This operation is reversible (applying the same mask twice yields the original data).
pub fn apply_mask(payload: &mut [u8], mask: &[u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// Errors that can occur while framing or unframing WebSocket data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebSocketError {
    /// The buffer ends before the frame it describes does
    TruncatedFrame {
        /// Bytes the header says are required
        needed: usize,
        /// Bytes actually present
        available: usize,
    },
    /// The declared payload length disagrees with the bytes supplied
    InvalidLength {
        /// Payload length declared by the header
        declared: u64,
        /// Payload bytes actually present after the header
        available: usize,
    },
    /// The declared payload length exceeds the accepted maximum
    FrameTooLarge {
        /// Payload length declared by the header
        declared: u64,
        /// Largest accepted payload length
        limit: u64,
    },
    /// I/O error
    IoError(String),
}

impl fmt::Display for WebSocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebSocketError::TruncatedFrame { needed, available } => write!(
                f,
                "Truncated WebSocket frame: need {} bytes, have {}",
                needed, available
            ),
            WebSocketError::InvalidLength {
                declared,
                available,
            } => write!(
                f,
                "Declared payload length {} does not match {} available bytes",
                declared, available
            ),
            WebSocketError::FrameTooLarge { declared, limit } => write!(
                f,
                "Frame payload of {} bytes exceeds limit of {}",
                declared, limit
            ),
            WebSocketError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for WebSocketError {}

impl From<std::io::Error> for WebSocketError {
    fn from(err: std::io::Error) -> Self {
        WebSocketError::IoError(err.to_string())
    }
}
