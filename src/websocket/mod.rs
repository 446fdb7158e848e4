//! WebSocket frame codec implementation conforming to RFC 6455.
//!
//! This module provides single-frame encoding and decoding. Outbound frames
//! are never masked or fragmented; inbound frames are unmasked.

mod codec;
mod decoder;
mod encoder;
mod frame;

pub use codec::FrameCodec;
pub use decoder::{CompleteFrame, FrameDecoder, FrameHeader, MAX_PAYLOAD_LEN};
pub use encoder::FrameEncoder;
pub use frame::{WebSocketError, WebSocketFrame, WebSocketOpcode, apply_mask};
