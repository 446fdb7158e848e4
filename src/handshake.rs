//! HTTP/1.1 Upgrade handshake per RFC 6455 Section 4.2.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use http::header::{
    CONNECTION, CONTENT_LENGTH, GetAll, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY,
    SEC_WEBSOCKET_VERSION, UPGRADE,
};
use http::{HeaderValue, Method, Request, Response, StatusCode, Version};
use sha1::{Digest, Sha1};
use std::io;

use crate::connection::Connection;
use crate::protocol::{Handshake, HandshakeError};

/// GUID appended to the client key before hashing (RFC 6455 Section 1.3).
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Largest request head accepted before the upgrade is refused (8 KiB).
pub const DEFAULT_MAX_REQUEST_LEN: usize = 8192;

/// Compute the `Sec-WebSocket-Accept` value for a client's
/// `Sec-WebSocket-Key`.
pub fn accept_key(sec_key: &HeaderValue) -> String {
    let mut sha = Sha1::new();
    sha.update(sec_key.as_bytes());
    sha.update(WEBSOCKET_GUID.as_bytes());
    B64.encode(sha.finalize())
}

/// Check that `request` is a valid WebSocket upgrade and return its key.
pub fn validate_upgrade<T>(request: &Request<T>) -> Result<HeaderValue, HandshakeError> {
    if request.method() != Method::GET {
        return Err(rejected("upgrade requires GET"));
    }
    if request.version() < Version::HTTP_11 {
        return Err(rejected("upgrade requires HTTP/1.1"));
    }

    let headers = request.headers();
    if !has_token(headers.get_all(UPGRADE), "websocket") {
        return Err(rejected("Upgrade header must contain 'websocket'"));
    }
    if !has_token(headers.get_all(CONNECTION), "upgrade") {
        return Err(rejected("Connection header must contain 'upgrade'"));
    }
    if headers.get(SEC_WEBSOCKET_VERSION).map(HeaderValue::as_bytes) != Some(&b"13"[..]) {
        return Err(rejected("Sec-WebSocket-Version must be 13"));
    }

    let key = headers
        .get(SEC_WEBSOCKET_KEY)
        .ok_or_else(|| rejected("missing Sec-WebSocket-Key"))?;
    match B64.decode(key.as_bytes()) {
        Ok(nonce) if nonce.len() == 16 => Ok(key.clone()),
        _ => Err(rejected("Sec-WebSocket-Key must be 16 base64-encoded bytes")),
    }
}

/// Answers upgrade requests buffered in the connection cache.
///
/// The request head is parsed into an [`http::Request`], validated, and
/// answered with `101 Switching Protocols`. Invalid requests are answered
/// with `400 Bad Request`. Either way the request head is consumed from the
/// cache.
#[derive(Debug, Clone)]
pub struct UpgradeHandshake {
    max_request_len: usize,
}

impl UpgradeHandshake {
    /// Create a handshake accepting request heads up to 8 KiB.
    pub fn new() -> Self {
        Self::with_max_request_len(DEFAULT_MAX_REQUEST_LEN)
    }

    /// Create a handshake accepting request heads up to `len` bytes.
    pub fn with_max_request_len(len: usize) -> Self {
        Self {
            max_request_len: len,
        }
    }

    fn refuse(
        &self,
        connection: &mut dyn Connection,
        reason: &HandshakeError,
    ) -> Result<Option<bool>, HandshakeError> {
        tracing::debug!(%reason, "refusing websocket upgrade");
        let response = Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header(SEC_WEBSOCKET_VERSION, "13")
            .header(CONNECTION, "close")
            .header(CONTENT_LENGTH, "0")
            .body(())?;
        write_response(connection, &response)?;
        Ok(Some(false))
    }
}

impl Default for UpgradeHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake for UpgradeHandshake {
    fn accept(&self, connection: &mut dyn Connection) -> Result<Option<bool>, HandshakeError> {
        let Some(head_len) = find_head_end(connection.cache()) else {
            if connection.cache().len() > self.max_request_len {
                connection.clean_cache();
                return self.refuse(connection, &rejected("request head too large"));
            }
            return Ok(None);
        };
        if head_len > self.max_request_len {
            connection.consume_cache(head_len);
            return self.refuse(connection, &rejected("request head too large"));
        }

        let request = read_request(&connection.cache()[..head_len]);
        connection.consume_cache(head_len);

        let key = match request.and_then(|request| validate_upgrade(&request)) {
            Ok(key) => key,
            Err(reason) => return self.refuse(connection, &reason),
        };

        let response = Response::builder()
            .status(StatusCode::SWITCHING_PROTOCOLS)
            .header(UPGRADE, "websocket")
            .header(CONNECTION, "Upgrade")
            .header(SEC_WEBSOCKET_ACCEPT, accept_key(&key))
            .body(())?;
        write_response(connection, &response)?;

        tracing::debug!("websocket upgrade accepted");
        Ok(Some(true))
    }
}

fn rejected(reason: &str) -> HandshakeError {
    HandshakeError::Rejected(reason.to_string())
}

/// Repeated header lines count as one comma-separated list.
fn has_token(values: GetAll<'_, HeaderValue>, token: &str) -> bool {
    values
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|item| item.trim().eq_ignore_ascii_case(token))
}

/// Length of the request head including the blank line, if complete.
fn find_head_end(data: &[u8]) -> Option<usize> {
    data.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Parse an HTTP/1.x request head into an `http::Request`.
fn read_request(head: &[u8]) -> Result<Request<()>, HandshakeError> {
    let head = std::str::from_utf8(head).map_err(|_| rejected("request head is not UTF-8"))?;
    let mut lines = head.split("\r\n").filter(|line| !line.is_empty());

    let request_line = lines.next().ok_or_else(|| rejected("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(uri), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(rejected("malformed request line"));
    };
    let version = match version {
        "HTTP/1.1" => Version::HTTP_11,
        "HTTP/1.0" => Version::HTTP_10,
        _ => return Err(rejected("unsupported HTTP version")),
    };

    let mut builder = Request::builder().method(method).uri(uri).version(version);
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| rejected("malformed header line"))?;
        builder = builder.header(name.trim(), value.trim());
    }
    Ok(builder.body(())?)
}

/// Serialize `response` as an HTTP/1.1 response head and write it.
fn write_response(
    connection: &mut dyn Connection,
    response: &Response<()>,
) -> Result<(), HandshakeError> {
    let status = response.status();
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        status.as_str(),
        status.canonical_reason().unwrap_or("")
    )
    .into_bytes();
    for (name, value) in response.headers() {
        head.extend_from_slice(name.as_str().as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }
    head.extend_from_slice(b"\r\n");

    if !connection.write(&head) {
        return Err(HandshakeError::Io(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "connection refused the handshake response",
        )));
    }
    Ok(())
}
