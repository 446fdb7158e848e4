//! Outbound frame encoding.

use super::frame::WebSocketOpcode;
use bytes::{BufMut, Bytes, BytesMut};

/// Largest payload length that fits in the 7-bit length field.
pub(crate) const MAX_INLINE_LEN: u64 = 125;
/// Largest payload length that fits in the 16-bit extended length field.
pub(crate) const MAX_U16_LEN: u64 = 0xFFFF;

/// Length-field marker announcing a 16-bit extended length.
pub(crate) const LEN_MARKER_U16: u8 = 126;
/// Length-field marker announcing a 64-bit extended length.
pub(crate) const LEN_MARKER_U64: u8 = 127;

/// Serializes payloads into single, unmasked, unfragmented frames.
///
/// The encoder never sets the mask bit and never writes RSV bits: frames
/// built here are meant to travel server to client with no extensions
/// negotiated.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameEncoder;

impl FrameEncoder {
    /// Encode `payload` as one frame with the given opcode and FIN bit.
    ///
    /// # Frame layout
    ///
    /// ```text
    /// +-+-+-+-+-------+-+-------------+-------------------------------+
    /// |F|0|0|0| opcode|0| Payload len |    Extended payload length    |
    /// |I| | | |  (4)  | |     (7)     |             (16/64)           |
    /// |N| | | |       | |             |   (if payload len==126/127)   |
    /// +-+-+-+-+-------+-+-------------+-------------------------------+
    /// |                         Payload Data                          |
    /// +---------------------------------------------------------------+
    /// ```
    pub fn build(payload: &[u8], opcode: WebSocketOpcode, fin: bool) -> Bytes {
        let mut frame = BytesMut::with_capacity(Self::encoded_len(payload.len()));

        // First byte: FIN, RSV1-3 (always zero), Opcode
        let mut byte1 = opcode.as_u8();
        if fin {
            byte1 |= 0b1000_0000;
        }
        frame.put_u8(byte1);

        // Second byte: MASK (always zero), Payload length
        let payload_len = payload.len() as u64;
        if payload_len <= MAX_INLINE_LEN {
            frame.put_u8(payload_len as u8);
        } else if payload_len <= MAX_U16_LEN {
            frame.put_u8(LEN_MARKER_U16);
            frame.put_u16(payload_len as u16);
        } else {
            frame.put_u8(LEN_MARKER_U64);
            frame.put_u64(payload_len);
        }

        frame.extend_from_slice(payload);
        frame.freeze()
    }

    /// Encode a text message as a single final frame.
    pub fn build_text(text: &str) -> Bytes {
        Self::build(text.as_bytes(), WebSocketOpcode::Text, true)
    }

    /// Exact number of bytes [`FrameEncoder::build`] produces for a payload
    /// of `payload_len` bytes.
    pub fn encoded_len(payload_len: usize) -> usize {
        let len_field = match payload_len as u64 {
            0..=MAX_INLINE_LEN => 0,
            126..=MAX_U16_LEN => 2,
            _ => 8,
        };
        2 + len_field + payload_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_hello() {
        let encoded = FrameEncoder::build_text("hello");

        let expected = vec![
            0b1000_0001, // FIN=1, Opcode=Text
            5,           // Payload length=5
            b'h',
            b'e',
            b'l',
            b'l',
            b'o',
        ];
        assert_eq!(&encoded[..], &expected[..]);
    }

    #[test]
    fn test_encode_without_fin() {
        let encoded = FrameEncoder::build(b"a", WebSocketOpcode::Text, false);
        assert_eq!(&encoded[..], &[0x01, 0x01, b'a']);
    }

    #[test]
    fn test_encode_honors_any_opcode() {
        let encoded = FrameEncoder::build(b"", WebSocketOpcode::Reserved(0xF), true);
        assert_eq!(&encoded[..], &[0x8F, 0x00]);

        let encoded = FrameEncoder::build(&[1, 2], WebSocketOpcode::Binary, true);
        assert_eq!(&encoded[..], &[0x82, 0x02, 1, 2]);
    }

    #[test]
    fn test_length_125_uses_single_byte() {
        let payload = vec![b'x'; 125];
        let encoded = FrameEncoder::build(&payload, WebSocketOpcode::Text, true);
        assert_eq!(encoded[1], 125);
        assert_eq!(encoded.len(), 2 + 125);
    }

    #[test]
    fn test_length_126_uses_16bit_field() {
        let payload = vec![b'x'; 126];
        let encoded = FrameEncoder::build(&payload, WebSocketOpcode::Text, true);
        assert_eq!(&encoded[1..4], &[126, 0x00, 0x7E]);
        assert_eq!(encoded.len(), 4 + 126);
    }

    #[test]
    fn test_length_65535_uses_16bit_field() {
        let payload = vec![0u8; 65535];
        let encoded = FrameEncoder::build(&payload, WebSocketOpcode::Text, true);
        assert_eq!(&encoded[1..4], &[126, 0xFF, 0xFF]);
    }

    #[test]
    fn test_length_65536_uses_64bit_field() {
        let payload = vec![0u8; 65536];
        let encoded = FrameEncoder::build(&payload, WebSocketOpcode::Text, true);
        assert_eq!(
            &encoded[1..10],
            &[127, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00]
        );
        assert_eq!(encoded.len(), 10 + 65536);
    }

    #[test]
    fn test_mask_bit_never_set() {
        for len in [0usize, 125, 126, 70000] {
            let encoded = FrameEncoder::build(&vec![7u8; len], WebSocketOpcode::Text, true);
            assert_eq!(encoded[1] & 0b1000_0000, 0);
            assert_eq!(encoded.len(), FrameEncoder::encoded_len(len));
        }
    }
}
