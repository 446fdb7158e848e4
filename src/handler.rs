//! Handler trait for processing inbound WebSocket messages
//!
//! A [`MessageHandler`] is the "on message" hook of a [`Session`]: it is
//! called once for every payload the protocol cuts out of the connection
//! cache, and answers through a [`Reply`].
//!
//! # Examples
//!
//! ## Echo handler
//!
//! ```
//! use bytes::Bytes;
//! use ws_protocol::{MessageHandler, Reply};
//!
//! struct EchoHandler;
//!
//! impl MessageHandler for EchoHandler {
//!     type Error = std::convert::Infallible;
//!
//!     async fn handle(&self, message: Bytes, reply: &mut Reply<'_>) -> Result<(), Self::Error> {
//!         let text = String::from_utf8_lossy(&message);
//!         reply.send(&format!("you say: {}", text));
//!         Ok(())
//!     }
//! }
//! ```
//!
//! [`Session`]: crate::Session

use bytes::Bytes;
use std::fmt;

use crate::connection::{BufferedConnection, SocketInfo};
use crate::protocol::Protocol;
use crate::websocket::WebSocketError;

/// Trait for types that handle decoded messages
pub trait MessageHandler {
    /// The error type returned by the handler
    type Error: fmt::Display;

    /// Handle one inbound message
    #[allow(async_fn_in_trait)]
    async fn handle(&self, message: Bytes, reply: &mut Reply<'_>) -> Result<(), Self::Error>;
}

/// The connection a message arrived on, as seen by a [`MessageHandler`].
pub struct Reply<'a> {
    protocol: &'a dyn Protocol<Error = WebSocketError>,
    connection: &'a mut BufferedConnection,
}

impl<'a> Reply<'a> {
    /// Wrap a connection and the protocol that frames its messages.
    pub fn new(
        protocol: &'a dyn Protocol<Error = WebSocketError>,
        connection: &'a mut BufferedConnection,
    ) -> Self {
        Self {
            protocol,
            connection,
        }
    }

    /// Send a text message back to the peer. Returns false if the
    /// connection refused the write.
    pub fn send(&mut self, text: &str) -> bool {
        self.protocol.send(&mut *self.connection, text)
    }

    /// Addresses of the underlying transport
    pub fn socket_info(&self) -> &SocketInfo {
        self.connection.socket_info()
    }

    /// Stop the session once pending replies are flushed
    pub fn close(&mut self) {
        self.connection.close();
    }
}

impl fmt::Debug for Reply<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WebSocketProtocol;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    /// Handler that echoes the message with a prefix
    struct EchoHandler;

    impl MessageHandler for EchoHandler {
        type Error = String;

        async fn handle(&self, message: Bytes, reply: &mut Reply<'_>) -> Result<(), Self::Error> {
            let text = std::str::from_utf8(&message).map_err(|e| e.to_string())?;
            if reply.send(&format!("you say: {}", text)) {
                Ok(())
            } else {
                Err("write refused".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_echo_handler() {
        let protocol = WebSocketProtocol::new();
        let mut conn = BufferedConnection::new();

        let mut reply = Reply::new(&protocol, &mut conn);
        EchoHandler
            .handle(Bytes::from_static(b"hi"), &mut reply)
            .await
            .unwrap();

        let out = conn.take_outbound();
        assert_eq!(out[0], 0x81);
        assert_eq!(out[1] as usize, "you say: hi".len());
        assert_eq!(&out[2..], b"you say: hi");
    }

    #[tokio::test]
    async fn test_handler_error_on_closed_connection() {
        let protocol = WebSocketProtocol::new();
        let mut conn = BufferedConnection::new();
        conn.close();

        let mut reply = Reply::new(&protocol, &mut conn);
        let result = EchoHandler.handle(Bytes::from_static(b"hi"), &mut reply).await;
        assert_eq!(result.unwrap_err(), "write refused");
    }

    #[test]
    fn test_reply_socket_info_and_close() {
        let protocol = WebSocketProtocol::new();
        let remote = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 40000);
        let mut conn =
            BufferedConnection::new().with_socket_info(SocketInfo::new(None, Some(remote)));

        let mut reply = Reply::new(&protocol, &mut conn);
        assert_eq!(reply.socket_info().remote, Some(remote));
        reply.close();
        assert!(conn.is_closed());
    }
}
