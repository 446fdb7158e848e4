//! Drives one WebSocket connection over any tokio byte stream.
//!
//! The session owns the transport. It feeds every read into a
//! [`BufferedConnection`], runs the handshake once, then hands each message
//! the protocol cuts out of the cache to a [`MessageHandler`], flushing
//! queued replies after every step.

use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::WebSocketConfig;
use crate::connection::{BufferedConnection, SocketInfo};
use crate::handler::{MessageHandler, Reply};
use crate::handshake::UpgradeHandshake;
use crate::protocol::{Handshake, Protocol, WebSocketProtocol};
use crate::websocket::WebSocketError;

/// Errors that end a session.
#[derive(Debug)]
pub enum SessionError {
    /// The transport failed
    IoError(String),
    /// The peer's upgrade request was refused
    HandshakeRejected,
    /// Inbound bytes could not be decoded
    Frame(WebSocketError),
    /// The message handler failed
    Handler(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::IoError(msg) => write!(f, "I/O error: {}", msg),
            SessionError::HandshakeRejected => write!(f, "WebSocket handshake rejected"),
            SessionError::Frame(err) => write!(f, "Frame error: {}", err),
            SessionError::Handler(msg) => write!(f, "Handler error: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::IoError(err.to_string())
    }
}

impl From<WebSocketError> for SessionError {
    fn from(err: WebSocketError) -> Self {
        SessionError::Frame(err)
    }
}

/// One WebSocket connection bound to a byte stream.
pub struct Session<S, H = UpgradeHandshake> {
    stream: S,
    protocol: WebSocketProtocol<H>,
    connection: BufferedConnection,
    read_buffer_size: usize,
}

impl<S> Session<S, UpgradeHandshake>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a session using the default handshake.
    pub fn new(stream: S, config: WebSocketConfig) -> Self {
        Self::with_protocol(stream, WebSocketProtocol::with_config(config), config)
    }
}

impl<S, H> Session<S, H>
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: Handshake,
{
    /// Create a session driving `stream` with a custom protocol adapter.
    pub fn with_protocol(
        stream: S,
        protocol: WebSocketProtocol<H>,
        config: WebSocketConfig,
    ) -> Self {
        Self {
            stream,
            protocol,
            connection: BufferedConnection::with_capacity(config.cache_capacity()),
            read_buffer_size: config.read_buffer_size(),
        }
    }

    /// Record the addresses the host bound this session to.
    pub fn with_socket_info(mut self, info: SocketInfo) -> Self {
        self.connection = self.connection.with_socket_info(info);
        self
    }

    /// Run until the peer disconnects or the handler closes the connection.
    ///
    /// Returns `Ok(())` on a clean end of stream.
    pub async fn run<M: MessageHandler>(mut self, handler: &M) -> Result<(), SessionError> {
        let remote = self.connection.socket_info().remote;
        let mut read_buf = vec![0u8; self.read_buffer_size];
        let mut upgraded = false;

        loop {
            let n = self.stream.read(&mut read_buf).await?;
            if n == 0 {
                tracing::debug!(?remote, "peer closed websocket stream");
                return Ok(());
            }
            self.connection.receive(&read_buf[..n]);

            if !upgraded {
                match self.protocol.handshake(&mut self.connection) {
                    // Need more data
                    None => continue,
                    Some(true) => {
                        upgraded = true;
                        self.flush().await?;
                    }
                    Some(false) => {
                        tracing::debug!(?remote, "closing stream after refused upgrade");
                        self.flush().await?;
                        self.stream.shutdown().await?;
                        return Err(SessionError::HandshakeRejected);
                    }
                }
            }

            while let Some(message) = self.protocol.cut(&mut self.connection)? {
                let mut reply = Reply::new(&self.protocol, &mut self.connection);
                if let Err(err) = handler.handle(message, &mut reply).await {
                    tracing::warn!(?remote, error = %err, "message handler failed");
                    self.flush().await?;
                    return Err(SessionError::Handler(err.to_string()));
                }
                self.flush().await?;

                if self.connection.is_closed() {
                    tracing::debug!(?remote, "handler closed websocket connection");
                    self.stream.shutdown().await?;
                    return Ok(());
                }
            }
        }
    }

    async fn flush(&mut self) -> Result<(), SessionError> {
        if !self.connection.has_outbound() {
            return Ok(());
        }
        let outbound = self.connection.take_outbound();
        self.stream.write_all(&outbound).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

impl<S, H: fmt::Debug> fmt::Debug for Session<S, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("protocol", &self.protocol)
            .field("connection", &self.connection)
            .field("read_buffer_size", &self.read_buffer_size)
            .finish_non_exhaustive()
    }
}
