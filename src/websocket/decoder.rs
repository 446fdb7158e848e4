//! Inbound frame decoding.
//!
//! Decoding is split in two steps. [`FrameDecoder::resolve`] and
//! [`FrameDecoder::resolve_exact`] locate the boundary of one complete frame
//! inside a buffer and hand back a [`CompleteFrame`]; only then does
//! [`FrameDecoder::decode`] unmask the payload. A `CompleteFrame` cannot be
//! built any other way, so decoding never reads past the end of its input.

use super::encoder::{LEN_MARKER_U16, LEN_MARKER_U64};
use super::frame::{WebSocketError, WebSocketFrame, WebSocketOpcode, apply_mask};
use bytes::BytesMut;

/// Largest payload length RFC 6455 allows (the most significant bit of the
/// 64-bit length must be zero).
pub const MAX_PAYLOAD_LEN: u64 = i64::MAX as u64;

/// The fixed and variable-length header fields of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// FIN bit
    pub fin: bool,
    /// RSV1-3 bits, right-aligned
    pub rsv: u8,
    /// Opcode
    pub opcode: WebSocketOpcode,
    /// Masking key, present iff the MASK bit is set
    pub masking_key: Option<[u8; 4]>,
    /// Declared payload length
    pub payload_len: u64,
    /// Bytes occupied by the header, extended length and masking key
    pub header_len: usize,
}

impl FrameHeader {
    /// Parse the header at the start of `data`.
    ///
    /// The cursor walks byte 0 (FIN/RSV/opcode), byte 1 (MASK/length), the
    /// optional 2 or 8 byte extended length and the optional 4 byte masking
    /// key. Returns [`WebSocketError::TruncatedFrame`] if `data` ends first.
    /// The payload itself is not inspected.
    ///
    /// ```text
    ///  0                   1                   2                   3
    ///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    /// +-+-+-+-+-------+-+-------------+-------------------------------+
    /// |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
    /// |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
    /// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
    /// | |1|2|3|       |K|             |                               |
    /// +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
    /// |     Extended payload length continued, if payload len == 127  |
    /// + - - - - - - - - - - - - - - - +-------------------------------+
    /// |                               |Masking-key, if MASK set to 1  |
    /// +-------------------------------+-------------------------------+
    /// | Masking-key (continued)       |          Payload Data         |
    /// +-------------------------------- - - - - - - - - - - - - - - - +
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self, WebSocketError> {
        let truncated = |needed: usize| WebSocketError::TruncatedFrame {
            needed,
            available: data.len(),
        };

        if data.len() < 2 {
            return Err(truncated(2));
        }

        // First byte: FIN, RSV1-3, Opcode
        let byte1 = data[0];
        let fin = (byte1 & 0b1000_0000) != 0;
        let rsv = (byte1 & 0b0111_0000) >> 4;
        let opcode = WebSocketOpcode::from_bits(byte1);

        // Second byte: MASK, Payload length
        let byte2 = data[1];
        let masked = (byte2 & 0b1000_0000) != 0;
        let mut payload_len = (byte2 & 0b0111_1111) as u64;

        let mut offset = 2;

        if payload_len == LEN_MARKER_U16 as u64 {
            let bytes = data.get(offset..offset + 2).ok_or_else(|| truncated(offset + 2))?;
            payload_len = u16::from_be_bytes([bytes[0], bytes[1]]) as u64;
            offset += 2;
        } else if payload_len == LEN_MARKER_U64 as u64 {
            let bytes: [u8; 8] = data
                .get(offset..offset + 8)
                .and_then(|slice| slice.try_into().ok())
                .ok_or_else(|| truncated(offset + 8))?;
            payload_len = u64::from_be_bytes(bytes);
            offset += 8;
        }

        let masking_key = if masked {
            let key: [u8; 4] = data
                .get(offset..offset + 4)
                .and_then(|slice| slice.try_into().ok())
                .ok_or_else(|| truncated(offset + 4))?;
            offset += 4;
            Some(key)
        } else {
            None
        };

        Ok(FrameHeader {
            fin,
            rsv,
            opcode,
            masking_key,
            payload_len,
            header_len: offset,
        })
    }

    /// Total frame size (header plus payload), checked against `limit`.
    fn frame_len(&self, limit: u64) -> Result<usize, WebSocketError> {
        let limit = limit.min(MAX_PAYLOAD_LEN);
        let too_large = WebSocketError::FrameTooLarge {
            declared: self.payload_len,
            limit,
        };
        if self.payload_len > limit {
            return Err(too_large);
        }
        usize::try_from(self.payload_len)
            .ok()
            .and_then(|len| len.checked_add(self.header_len))
            .ok_or(too_large)
    }
}

/// The bytes of exactly one frame whose boundary has been resolved.
///
/// Obtained from [`FrameDecoder::resolve`] or [`FrameDecoder::resolve_exact`];
/// holding one proves the header, extended length, masking key and the whole
/// declared payload are present.
#[derive(Debug, Clone, Copy)]
pub struct CompleteFrame<'a> {
    header: FrameHeader,
    bytes: &'a [u8],
}

impl<'a> CompleteFrame<'a> {
    /// The parsed header of this frame.
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Total number of bytes this frame occupies on the wire.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: a frame carries at least its two header bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The raw (still masked) wire bytes of this frame.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Deserializes buffered bytes into frames, unmasking payloads.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    max_payload_len: u64,
}

impl FrameDecoder {
    /// Create a decoder accepting any payload length RFC 6455 permits.
    pub fn new() -> Self {
        Self::with_max_payload_len(MAX_PAYLOAD_LEN)
    }

    /// Create a decoder rejecting payloads longer than `max_payload_len`.
    pub fn with_max_payload_len(max_payload_len: u64) -> Self {
        Self {
            max_payload_len: max_payload_len.min(MAX_PAYLOAD_LEN),
        }
    }

    /// Largest payload length this decoder accepts.
    pub fn max_payload_len(&self) -> u64 {
        self.max_payload_len
    }

    /// Resolve the first complete frame at the head of `data`.
    ///
    /// Returns `Ok(None)` while `data` holds less than one frame. Bytes after
    /// the first frame are ignored and belong to the next one.
    pub fn resolve<'a>(
        &self,
        data: &'a [u8],
    ) -> Result<Option<CompleteFrame<'a>>, WebSocketError> {
        let header = match FrameHeader::parse(data) {
            Ok(header) => header,
            Err(WebSocketError::TruncatedFrame { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let frame_len = header.frame_len(self.max_payload_len)?;
        Ok(data.get(..frame_len).map(|bytes| CompleteFrame { header, bytes }))
    }

    /// Resolve `data` as exactly one frame.
    ///
    /// Shorter input yields [`WebSocketError::TruncatedFrame`]; input with
    /// bytes past the declared payload yields
    /// [`WebSocketError::InvalidLength`].
    pub fn resolve_exact<'a>(&self, data: &'a [u8]) -> Result<CompleteFrame<'a>, WebSocketError> {
        let header = FrameHeader::parse(data)?;
        let frame_len = header.frame_len(self.max_payload_len)?;
        if data.len() < frame_len {
            return Err(WebSocketError::TruncatedFrame {
                needed: frame_len,
                available: data.len(),
            });
        }
        if data.len() > frame_len {
            return Err(WebSocketError::InvalidLength {
                declared: header.payload_len,
                available: data.len() - header.header_len,
            });
        }
        Ok(CompleteFrame {
            header,
            bytes: data,
        })
    }

    /// Size of the first complete frame in `data`, or `None` if more bytes
    /// are needed.
    pub fn frame_len(&self, data: &[u8]) -> Result<Option<usize>, WebSocketError> {
        Ok(self.resolve(data)?.map(|frame| frame.len()))
    }

    /// Unmask and materialize a resolved frame.
    pub fn decode(&self, frame: CompleteFrame<'_>) -> WebSocketFrame {
        let header = frame.header;
        let mut payload = BytesMut::from(&frame.bytes[header.header_len..]);

        if let Some(key) = header.masking_key {
            apply_mask(&mut payload, &key);
        }

        WebSocketFrame {
            fin: header.fin,
            rsv: header.rsv,
            opcode: header.opcode,
            masked: header.masking_key.is_some(),
            masking_key: header.masking_key,
            payload: payload.freeze(),
        }
    }

    /// Decode `raw`, which must be the full content of exactly one frame.
    pub fn parse(&self, raw: &[u8]) -> Result<WebSocketFrame, WebSocketError> {
        let frame = self.resolve_exact(raw)?;
        Ok(self.decode(frame))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
