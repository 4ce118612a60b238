//! Codec tests (castlink-core)
//!
//! Wire-level properties of the envelope codec:
//! - encode/decode round-trip across payload kinds
//! - incremental decoding over arbitrary chunk boundaries
//! - framing guards (truncated stream, hostile length prefix)

use bytes::{Bytes, BytesMut};
use castlink_core::{codec, ns, Envelope, Error, Payload, MAX_FRAME_SIZE, RECEIVER_ID, SENDER_ID};
use serde_json::json;

fn sample_envelopes() -> Vec<Envelope> {
    vec![
        Envelope::to_receiver(ns::CONNECTION, json!({"type": "CONNECT"})),
        Envelope::to_receiver(ns::HEARTBEAT, json!({"type": "PING"})),
        Envelope::to_receiver(
            ns::RECEIVER,
            json!({"type": "LAUNCH", "appId": "CC1AD845", "requestId": 1}),
        ),
        Envelope::json(
            "sender-custom",
            "app-transport-7",
            ns::MEDIA,
            json!({"type": "SEEK", "currentTime": 42.25, "mediaSessionId": 2, "requestId": 5}),
        ),
        Envelope::binary(
            SENDER_ID,
            RECEIVER_ID,
            "urn:x-cast:com.example.blob",
            Bytes::from(vec![0u8, 1, 2, 254, 255]),
        ),
    ]
}

#[test]
fn roundtrip_preserves_every_field() {
    for envelope in sample_envelopes() {
        let encoded = codec::encode(&envelope).unwrap();
        let mut buf = BytesMut::from(&encoded[..]);
        let decoded = codec::decode(&mut buf)
            .unwrap()
            .expect("complete frame must decode");

        assert_eq!(decoded.source_id, envelope.source_id);
        assert_eq!(decoded.destination_id, envelope.destination_id);
        assert_eq!(decoded.namespace, envelope.namespace);
        assert_eq!(decoded.protocol_version, envelope.protocol_version);
        assert_eq!(decoded.payload, envelope.payload);
        assert!(buf.is_empty(), "decode must consume exactly one frame");
    }
}

#[test]
fn decode_survives_single_byte_feeding() {
    let envelope = Envelope::to_receiver(
        ns::RECEIVER,
        json!({"type": "GET_STATUS", "requestId": 99}),
    );
    let encoded = codec::encode(&envelope).unwrap();

    let mut buf = BytesMut::new();
    for (i, byte) in encoded.iter().enumerate() {
        buf.extend_from_slice(&[*byte]);
        let result = codec::decode(&mut buf).unwrap();
        if i + 1 < encoded.len() {
            assert!(result.is_none(), "must not decode before byte {}", i);
        } else {
            assert_eq!(result.unwrap(), envelope);
        }
    }
}

#[test]
fn truncated_stream_never_yields_a_value() {
    // A declared length of N with fewer than N bytes buffered must neither
    // produce an envelope nor consume input; at stream end the transport
    // reports the framing failure.
    let envelope = Envelope::to_receiver(ns::HEARTBEAT, json!({"type": "PONG"}));
    let encoded = codec::encode(&envelope).unwrap();

    for cut in 1..encoded.len() {
        let mut buf = BytesMut::from(&encoded[..cut]);
        assert!(codec::decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), cut);
    }
}

#[test]
fn hostile_length_prefix_fails_cleanly() {
    let mut buf = BytesMut::from(&u32::MAX.to_be_bytes()[..]);
    assert!(matches!(
        codec::decode(&mut buf),
        Err(Error::FrameTooLarge(_))
    ));
}

#[test]
fn max_frame_boundary() {
    // A payload comfortably under the cap encodes; a payload at the cap
    // (which pushes the body over it) does not.
    let fits = Envelope::binary(
        SENDER_ID,
        RECEIVER_ID,
        ns::MEDIA,
        Bytes::from(vec![0xAB; MAX_FRAME_SIZE - 256]),
    );
    let encoded = codec::encode(&fits).unwrap();
    let decoded = codec::decode(&mut BytesMut::from(&encoded[..]))
        .unwrap()
        .unwrap();
    assert_eq!(decoded.payload, fits.payload);

    let too_big = Envelope::binary(
        SENDER_ID,
        RECEIVER_ID,
        ns::MEDIA,
        Bytes::from(vec![0xAB; MAX_FRAME_SIZE]),
    );
    assert!(matches!(
        codec::encode(&too_big),
        Err(Error::FrameTooLarge(_))
    ));
}

#[test]
fn json_payload_is_utf8_text_on_the_wire() {
    let envelope = Envelope::to_receiver(ns::RECEIVER, json!({"type": "GET_STATUS"}));
    let encoded = codec::encode(&envelope).unwrap();
    let haystack = &encoded[..];
    let needle = b"GET_STATUS";
    assert!(
        haystack.windows(needle.len()).any(|w| w == needle),
        "JSON payloads are carried as readable UTF-8 text"
    );

    match codec::decode(&mut BytesMut::from(haystack)).unwrap().unwrap().payload {
        Payload::Json(v) => assert_eq!(v["type"], "GET_STATUS"),
        Payload::Binary(_) => panic!("expected JSON payload"),
    }
}
