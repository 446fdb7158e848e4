//! The protocol capability set a connection host dispatches to.
//!
//! A host drives every connection through the seven operations of
//! [`Protocol`]: it calls [`handshake`](Protocol::handshake) once per new
//! connection, [`cut`](Protocol::cut) whenever bytes arrive, and
//! [`send`](Protocol::send) to reply. [`WebSocketProtocol`] is the RFC 6455
//! implementation; other wire protocols implement the same trait.

use bytes::Bytes;
use std::{fmt, io};

use crate::config::WebSocketConfig;
use crate::connection::Connection;
use crate::handshake::UpgradeHandshake;
use crate::websocket::{FrameDecoder, FrameEncoder, WebSocketError, WebSocketOpcode};

/// Outcome of an operation a protocol may not implement.
///
/// Kept distinct from `Result` so that an unsupported operation can never be
/// read as an empty success.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Capability<T> {
    /// The protocol performed the operation
    Supported(T),
    /// The protocol does not implement the operation
    Unsupported,
}

impl<T> Capability<T> {
    /// Check whether the operation is unsupported
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Capability::Unsupported)
    }

    /// Convert into an `Option`, discarding the unsupported marker
    pub fn supported(self) -> Option<T> {
        match self {
            Capability::Supported(value) => Some(value),
            Capability::Unsupported => None,
        }
    }
}

/// Errors raised by a [`Handshake`] collaborator.
#[derive(Debug)]
pub enum HandshakeError {
    /// The transport or a backing file failed
    Io(io::Error),
    /// The request could not be turned into an HTTP message
    Http(http::Error),
    /// The request is not an acceptable upgrade
    Rejected(String),
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::Io(err) => write!(f, "Handshake I/O error: {}", err),
            HandshakeError::Http(err) => write!(f, "Handshake HTTP error: {}", err),
            HandshakeError::Rejected(reason) => write!(f, "Handshake rejected: {}", reason),
        }
    }
}

impl std::error::Error for HandshakeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandshakeError::Io(err) => Some(err),
            HandshakeError::Http(err) => Some(err),
            HandshakeError::Rejected(_) => None,
        }
    }
}

impl From<io::Error> for HandshakeError {
    fn from(err: io::Error) -> Self {
        HandshakeError::Io(err)
    }
}

impl From<http::Error> for HandshakeError {
    fn from(err: http::Error) -> Self {
        HandshakeError::Http(err)
    }
}

/// Negotiates the protocol upgrade for a freshly accepted connection.
pub trait Handshake {
    /// Inspect the connection cache and answer the upgrade request.
    ///
    /// Returns `Ok(None)` while the request is incomplete, `Ok(Some(true))`
    /// once the upgrade has been accepted and `Ok(Some(false))` when it has
    /// been refused.
    fn accept(&self, connection: &mut dyn Connection) -> Result<Option<bool>, HandshakeError>;
}

/// The operations a connection host requires from a wire protocol.
///
/// # Examples
///
/// ```
/// use ws_protocol::{BufferedConnection, Connection, Protocol, WebSocketProtocol};
///
/// let protocol = WebSocketProtocol::new();
/// let mut connection = BufferedConnection::new();
///
/// // A masked client frame carrying "hi"
/// connection.receive(&[0x81, 0x82, 0x00, 0x00, 0x00, 0x00, b'h', b'i']);
/// let message = protocol.cut(&mut connection).unwrap();
/// assert_eq!(message.as_deref(), Some(&b"hi"[..]));
/// assert!(connection.cache().is_empty());
///
/// assert!(protocol.send(&mut connection, "you say: hi"));
/// ```
pub trait Protocol {
    /// Error produced when inbound bytes cannot be decoded
    type Error;

    /// Encode `text` and write it to the connection. Returns the write result.
    fn send(&self, connection: &mut dyn Connection, text: &str) -> bool;

    /// Encode a payload into wire bytes.
    fn build(&self, payload: &[u8], opcode: WebSocketOpcode, fin: bool) -> Bytes;

    /// Check a message's integrity.
    fn verify(&self, payload: &[u8], options: Option<&http::Extensions>) -> Capability<Bytes>;

    /// Extract the next complete message from the connection cache.
    ///
    /// Returns `Ok(None)` until a whole message has been buffered.
    fn cut(&self, connection: &mut dyn Connection) -> Result<Option<Bytes>, Self::Error>;

    /// Decode the connection cache as exactly one message and clear it.
    fn parse(&self, connection: &mut dyn Connection) -> Result<Bytes, Self::Error>;

    /// Resynchronize a cache that holds garbage.
    fn corrective(&self, connection: &mut dyn Connection) -> Capability<Bytes>;

    /// Run the upgrade handshake. `None` means more bytes are needed.
    fn handshake(&self, connection: &mut dyn Connection) -> Option<bool>;
}

/// The RFC 6455 protocol adapter.
///
/// Outbound messages become single unmasked final frames; inbound frames
/// are unmasked and returned one at a time. The upgrade handshake is left to
/// the `H` collaborator.
#[derive(Debug, Clone)]
pub struct WebSocketProtocol<H = UpgradeHandshake> {
    handshake: H,
    decoder: FrameDecoder,
}

impl WebSocketProtocol<UpgradeHandshake> {
    /// Create an adapter with the default handshake and configuration.
    pub fn new() -> Self {
        Self::with_config(WebSocketConfig::default())
    }

    /// Create an adapter with the default handshake.
    pub fn with_config(config: WebSocketConfig) -> Self {
        Self::with_handshake(UpgradeHandshake::new(), config)
    }
}

impl Default for WebSocketProtocol<UpgradeHandshake> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handshake> WebSocketProtocol<H> {
    /// Create an adapter delegating upgrades to `handshake`.
    pub fn with_handshake(handshake: H, config: WebSocketConfig) -> Self {
        Self {
            handshake,
            decoder: FrameDecoder::with_max_payload_len(config.max_payload_len()),
        }
    }

    /// The frame decoder used for inbound bytes.
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }
}

impl<H: Handshake> Protocol for WebSocketProtocol<H> {
    type Error = WebSocketError;

    fn send(&self, connection: &mut dyn Connection, text: &str) -> bool {
        let frame = FrameEncoder::build_text(text);
        connection.write(&frame)
    }

    fn build(&self, payload: &[u8], opcode: WebSocketOpcode, fin: bool) -> Bytes {
        FrameEncoder::build(payload, opcode, fin)
    }

    fn verify(&self, _payload: &[u8], _options: Option<&http::Extensions>) -> Capability<Bytes> {
        Capability::Unsupported
    }

    fn cut(&self, connection: &mut dyn Connection) -> Result<Option<Bytes>, Self::Error> {
        let (payload, consumed) = match self.decoder.resolve(connection.cache())? {
            Some(frame) => (self.decoder.decode(frame).payload, frame.len()),
            None => return Ok(None),
        };

        connection.consume_cache(consumed);
        Ok(Some(payload))
    }

    fn parse(&self, connection: &mut dyn Connection) -> Result<Bytes, Self::Error> {
        let frame = self.decoder.parse(connection.cache())?;
        connection.clean_cache();
        Ok(frame.payload)
    }

    fn corrective(&self, _connection: &mut dyn Connection) -> Capability<Bytes> {
        Capability::Unsupported
    }

    fn handshake(&self, connection: &mut dyn Connection) -> Option<bool> {
        match self.handshake.accept(connection) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = %err, "websocket handshake failed");
                Some(false)
            }
        }
    }
}
