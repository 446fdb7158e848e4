//! A WebSocket wire-protocol codec and the protocol adapter a connection
//! host drives it through.

#![warn(clippy::dbg_macro, clippy::print_stdout)]
#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod handler;
pub mod handshake;
pub mod protocol;
pub mod session;

/// WebSocket frame codec for RFC 6455 compliant framing
pub mod websocket;

pub use config::WebSocketConfig;
pub use connection::{BufferedConnection, Connection, SocketInfo};
pub use handler::{MessageHandler, Reply};
pub use handshake::{UpgradeHandshake, accept_key, validate_upgrade};
pub use protocol::{Capability, Handshake, HandshakeError, Protocol, WebSocketProtocol};
pub use session::{Session, SessionError};
pub use websocket::{
    FrameCodec, FrameDecoder, FrameEncoder, WebSocketError, WebSocketFrame, WebSocketOpcode,
};
