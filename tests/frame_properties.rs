//! Property-based tests for the frame codec.
//!
//! These tests use proptest to verify wire-format invariants for arbitrary
//! inputs:
//! - Encoded frames decode back to the original payload, FIN and opcode
//! - Masked frames unmask to `C[i] XOR K[i % 4]`
//! - No buffer, however short or malformed, makes the decoder panic

use proptest::prelude::*;
use ws_protocol::{
    BufferedConnection, Connection, FrameDecoder, FrameEncoder, Protocol, WebSocketError,
    WebSocketOpcode, WebSocketProtocol,
};

// Strategy for generating payloads around every length-field tier
fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..=125),
        prop::collection::vec(any::<u8>(), 126..=300),
        (65530usize..=65540).prop_map(|len| vec![0x5A; len]),
    ]
}

fn masked_frame(fin: bool, ciphertext: &[u8], key: [u8; 4]) -> Vec<u8> {
    let mut frame = vec![if fin { 0x81 } else { 0x01 }];
    let len = ciphertext.len();
    if len < 126 {
        frame.push(0x80 | len as u8);
    } else if len <= 0xFFFF {
        frame.push(0x80 | 126);
        frame.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        frame.push(0x80 | 127);
        frame.extend_from_slice(&(len as u64).to_be_bytes());
    }
    frame.extend_from_slice(&key);
    frame.extend_from_slice(ciphertext);
    frame
}

#[test]
fn round_trip_at_tier_boundaries() {
    let decoder = FrameDecoder::new();
    for len in [0usize, 1, 125, 126, 65535, 65536] {
        for fin in [true, false] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let encoded = FrameEncoder::build(&payload, WebSocketOpcode::Text, fin);

            let frame = decoder.parse(&encoded).unwrap();
            assert_eq!(frame.fin, fin, "fin mismatch at length {len}");
            assert_eq!(frame.opcode, WebSocketOpcode::Text);
            assert!(!frame.masked);
            assert_eq!(&frame.payload[..], &payload[..], "payload mismatch at length {len}");
        }
    }
}

#[test]
fn hello_scenario() {
    let encoded = FrameEncoder::build_text("hello");
    assert_eq!(&encoded[..], &[0x81, 0x05, b'h', b'e', b'l', b'l', b'o']);

    let protocol = WebSocketProtocol::new();
    let mut conn = BufferedConnection::new();
    conn.receive(&encoded);

    let frame = protocol.decoder().parse(conn.cache()).unwrap();
    assert!(frame.fin);
    assert_eq!(frame.opcode.as_u8(), 1);

    let payload = protocol.parse(&mut conn).unwrap();
    assert_eq!(&payload[..], b"hello");
    assert!(conn.cache().is_empty());
}

#[test]
fn zero_mask_scenario() {
    let protocol = WebSocketProtocol::new();
    let mut conn = BufferedConnection::new();
    conn.receive(&masked_frame(true, b"hi", [0, 0, 0, 0]));

    assert_eq!(&protocol.parse(&mut conn).unwrap()[..], b"hi");
    assert!(conn.cache().is_empty());
}

#[test]
fn prop_encode_decode_round_trip() {
    proptest!(|(payload in payload_strategy(), fin in any::<bool>(), opcode in 0u8..16)| {
        let opcode = WebSocketOpcode::from_bits(opcode);
        let encoded = FrameEncoder::build(&payload, opcode, fin);
        prop_assert_eq!(encoded.len(), FrameEncoder::encoded_len(payload.len()));
        prop_assert_eq!(encoded[1] & 0x80, 0);

        let frame = FrameDecoder::new().parse(&encoded).unwrap();
        prop_assert_eq!(frame.fin, fin);
        prop_assert_eq!(frame.opcode, opcode);
        prop_assert_eq!(frame.rsv, 0);
        prop_assert_eq!(&frame.payload[..], &payload[..]);
    });
}

#[test]
fn prop_masked_payload_is_unmasked() {
    proptest!(|(ciphertext in payload_strategy(), key in any::<[u8; 4]>(), fin in any::<bool>())| {
        let protocol = WebSocketProtocol::new();
        let mut conn = BufferedConnection::new();
        conn.receive(&masked_frame(fin, &ciphertext, key));

        let payload = protocol.parse(&mut conn).unwrap();
        prop_assert_eq!(payload.len(), ciphertext.len());
        for (i, byte) in payload.iter().enumerate() {
            prop_assert_eq!(*byte, ciphertext[i] ^ key[i % 4]);
        }
        prop_assert!(conn.cache().is_empty());
    });
}

#[test]
fn prop_truncated_frames_are_reported() {
    proptest!(|(payload in prop::collection::vec(any::<u8>(), 1..=300), cut in 0usize..1000)| {
        let encoded = FrameEncoder::build(&payload, WebSocketOpcode::Binary, true);
        let cut = cut % encoded.len();

        let result = FrameDecoder::new().parse(&encoded[..cut]);
        let is_truncated = matches!(result, Err(WebSocketError::TruncatedFrame { .. }));
        prop_assert!(is_truncated);

        // cut waits instead of failing
        let protocol = WebSocketProtocol::new();
        let mut conn = BufferedConnection::new();
        conn.receive(&encoded[..cut]);
        prop_assert_eq!(protocol.cut(&mut conn).unwrap(), None);
        prop_assert_eq!(conn.cache().len(), cut);
    });
}

#[test]
fn prop_arbitrary_bytes_never_panic() {
    proptest!(|(data in prop::collection::vec(any::<u8>(), 0..64))| {
        let decoder = FrameDecoder::new();
        let _ = decoder.parse(&data);
        let _ = decoder.frame_len(&data);

        let protocol = WebSocketProtocol::new();
        let mut conn = BufferedConnection::new();
        conn.receive(&data);
        let _ = protocol.cut(&mut conn);
    });
}
