//! WebSocket codec for use with tokio_util::codec::Framed.
//!
//! This codec turns a byte stream into a stream of [`WebSocketFrame`]s and
//! encodes outbound messages as single unmasked frames. Fragmented messages
//! are not reassembled: every frame is yielded as it arrives.

use super::decoder::FrameDecoder;
use super::encoder::FrameEncoder;
use super::frame::{WebSocketError, WebSocketFrame, WebSocketOpcode};
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// WebSocket codec that implements tokio_util's Decoder and Encoder traits.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec {
    decoder: FrameDecoder,
}

impl FrameCodec {
    /// Create a new codec accepting any RFC 6455 payload length.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec that rejects payloads longer than `max_payload_len`.
    pub fn with_max_payload_len(max_payload_len: u64) -> Self {
        Self {
            decoder: FrameDecoder::with_max_payload_len(max_payload_len),
        }
    }
}

impl Decoder for FrameCodec {
    type Item = WebSocketFrame;
    type Error = WebSocketError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let (frame, consumed) = match self.decoder.resolve(&src[..])? {
            Some(complete) => (self.decoder.decode(complete), complete.len()),
            // Need more data
            None => return Ok(None),
        };

        src.advance(consumed);
        Ok(Some(frame))
    }
}

impl Encoder<WebSocketFrame> for FrameCodec {
    type Error = WebSocketError;

    fn encode(&mut self, frame: WebSocketFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // Outbound frames are never masked, whatever the frame says
        dst.extend_from_slice(&FrameEncoder::build(
            &frame.payload,
            frame.opcode,
            frame.fin,
        ));
        Ok(())
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = WebSocketError;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&FrameEncoder::build(
            &payload,
            WebSocketOpcode::Text,
            true,
        ));
        Ok(())
    }
}

impl Encoder<&str> for FrameCodec {
    type Error = WebSocketError;

    fn encode(&mut self, text: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&FrameEncoder::build_text(text));
        Ok(())
    }
}
