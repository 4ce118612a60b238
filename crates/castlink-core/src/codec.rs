//! Binary wire codec
//!
//! Wire format: a 4-byte big-endian length prefix followed by the envelope
//! body. The body is the Cast protobuf message encoding:
//!
//! ```text
//! field 1  varint            protocol version
//! field 2  length-delimited  source id (UTF-8)
//! field 3  length-delimited  destination id (UTF-8)
//! field 4  length-delimited  namespace (UTF-8)
//! field 5  varint            payload type (0 = UTF-8 JSON, 1 = binary)
//! field 6  length-delimited  payload, UTF-8 JSON text
//! field 7  length-delimited  payload, raw bytes
//! ```
//!
//! Decoding is incremental: [`decode`] consumes nothing until a complete
//! frame is buffered, so the transport's read loop can feed it arbitrary
//! chunk boundaries.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde_json::Value;

use crate::envelope::{Envelope, Payload};
use crate::error::{Error, Result};
use crate::MAX_FRAME_SIZE;

/// Length prefix size
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Wire field tags (field number << 3 | wire type)
mod tag {
    pub const PROTOCOL_VERSION: u32 = 1;
    pub const SOURCE_ID: u32 = 2;
    pub const DESTINATION_ID: u32 = 3;
    pub const NAMESPACE: u32 = 4;
    pub const PAYLOAD_TYPE: u32 = 5;
    pub const PAYLOAD_UTF8: u32 = 6;
    pub const PAYLOAD_BINARY: u32 = 7;
}

/// Payload type discriminants
mod payload_type {
    pub const STRING: u64 = 0;
    pub const BINARY: u64 = 1;
}

const WIRE_VARINT: u32 = 0;
const WIRE_LEN: u32 = 2;

/// Encode an envelope into a complete frame (length prefix + body)
pub fn encode(envelope: &Envelope) -> Result<Bytes> {
    let body = encode_body(envelope)?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge(body.len()));
    }

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    buf.put_u32(body.len() as u32);
    buf.extend_from_slice(&body);
    Ok(buf.freeze())
}

/// Decode one envelope from an accumulation buffer.
///
/// Returns `Ok(None)` while the buffered bytes do not yet hold a complete
/// frame; nothing is consumed in that case. A declared length above
/// [`MAX_FRAME_SIZE`] is a framing error.
pub fn decode(buf: &mut BytesMut) -> Result<Option<Envelope>> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let declared = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if declared > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge(declared));
    }

    if buf.len() < LENGTH_PREFIX_SIZE + declared {
        return Ok(None);
    }

    buf.advance(LENGTH_PREFIX_SIZE);
    let body = buf.split_to(declared);
    decode_body(&body).map(Some)
}

/// Encode just the envelope body (no length prefix)
pub fn encode_body(envelope: &Envelope) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(64 + payload_len(&envelope.payload));

    put_varint_field(&mut buf, tag::PROTOCOL_VERSION, envelope.protocol_version as u64);
    put_string_field(&mut buf, tag::SOURCE_ID, &envelope.source_id);
    put_string_field(&mut buf, tag::DESTINATION_ID, &envelope.destination_id);
    put_string_field(&mut buf, tag::NAMESPACE, &envelope.namespace);

    match &envelope.payload {
        Payload::Json(value) => {
            let text = serde_json::to_string(value)?;
            put_varint_field(&mut buf, tag::PAYLOAD_TYPE, payload_type::STRING);
            put_bytes_field(&mut buf, tag::PAYLOAD_UTF8, text.as_bytes());
        }
        Payload::Binary(bytes) => {
            put_varint_field(&mut buf, tag::PAYLOAD_TYPE, payload_type::BINARY);
            put_bytes_field(&mut buf, tag::PAYLOAD_BINARY, bytes);
        }
    }

    Ok(buf.freeze())
}

/// Decode an envelope body (no length prefix)
pub fn decode_body(mut body: &[u8]) -> Result<Envelope> {
    let mut protocol_version: Option<i32> = None;
    let mut source_id: Option<String> = None;
    let mut destination_id: Option<String> = None;
    let mut namespace: Option<String> = None;
    let mut ptype: Option<u64> = None;
    let mut utf8: Option<Vec<u8>> = None;
    let mut binary: Option<Vec<u8>> = None;

    while body.has_remaining() {
        let key = get_varint(&mut body)?;
        let field = (key >> 3) as u32;
        let wire = (key & 0x07) as u32;

        match (field, wire) {
            (tag::PROTOCOL_VERSION, WIRE_VARINT) => {
                protocol_version = Some(get_varint(&mut body)? as i32);
            }
            (tag::PAYLOAD_TYPE, WIRE_VARINT) => {
                ptype = Some(get_varint(&mut body)?);
            }
            (tag::SOURCE_ID, WIRE_LEN) => {
                source_id = Some(get_string(&mut body, "sourceId")?);
            }
            (tag::DESTINATION_ID, WIRE_LEN) => {
                destination_id = Some(get_string(&mut body, "destinationId")?);
            }
            (tag::NAMESPACE, WIRE_LEN) => {
                namespace = Some(get_string(&mut body, "namespace")?);
            }
            (tag::PAYLOAD_UTF8, WIRE_LEN) => {
                utf8 = Some(get_bytes(&mut body)?);
            }
            (tag::PAYLOAD_BINARY, WIRE_LEN) => {
                binary = Some(get_bytes(&mut body)?);
            }
            // Tolerate fields newer receivers may add
            (_, WIRE_VARINT) => {
                get_varint(&mut body)?;
            }
            (_, WIRE_LEN) => {
                get_bytes(&mut body)?;
            }
            (field, _) => return Err(Error::UnknownField(field)),
        }
    }

    let payload = match ptype.ok_or(Error::MissingField("payloadType"))? {
        payload_type::STRING => {
            let bytes = utf8.ok_or(Error::MissingField("payloadUtf8"))?;
            let value: Value = serde_json::from_slice(&bytes)?;
            Payload::Json(value)
        }
        payload_type::BINARY => {
            let bytes = binary.ok_or(Error::MissingField("payloadBinary"))?;
            Payload::Binary(Bytes::from(bytes))
        }
        other => return Err(Error::Decode(format!("unknown payload type: {other}"))),
    };

    Ok(Envelope {
        source_id: source_id.ok_or(Error::MissingField("sourceId"))?,
        destination_id: destination_id.ok_or(Error::MissingField("destinationId"))?,
        namespace: namespace.ok_or(Error::MissingField("namespace"))?,
        payload,
        protocol_version: protocol_version.ok_or(Error::MissingField("protocolVersion"))?,
    })
}

fn payload_len(payload: &Payload) -> usize {
    match payload {
        Payload::Json(_) => 256,
        Payload::Binary(bytes) => bytes.len(),
    }
}

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

fn put_varint_field(buf: &mut BytesMut, field: u32, value: u64) {
    put_varint(buf, ((field << 3) | WIRE_VARINT) as u64);
    put_varint(buf, value);
}

fn put_bytes_field(buf: &mut BytesMut, field: u32, bytes: &[u8]) {
    put_varint(buf, ((field << 3) | WIRE_LEN) as u64);
    put_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn put_string_field(buf: &mut BytesMut, field: u32, s: &str) {
    put_bytes_field(buf, field, s.as_bytes());
}

fn get_varint(buf: &mut &[u8]) -> Result<u64> {
    let mut value: u64 = 0;
    for shift in (0..64).step_by(7) {
        if !buf.has_remaining() {
            return Err(Error::BufferTooSmall {
                needed: 1,
                have: 0,
            });
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(Error::MalformedVarint)
}

fn get_bytes(buf: &mut &[u8]) -> Result<Vec<u8>> {
    let len = get_varint(buf)? as usize;
    if buf.remaining() < len {
        return Err(Error::BufferTooSmall {
            needed: len,
            have: buf.remaining(),
        });
    }
    let bytes = buf[..len].to_vec();
    buf.advance(len);
    Ok(bytes)
}

fn get_string(buf: &mut &[u8], field: &'static str) -> Result<String> {
    let bytes = get_bytes(buf)?;
    String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ns, RECEIVER_ID, SENDER_ID};
    use serde_json::json;

    #[test]
    fn test_json_roundtrip() {
        let envelope = Envelope::json(
            SENDER_ID,
            RECEIVER_ID,
            ns::RECEIVER,
            json!({"type": "GET_STATUS", "requestId": 7}),
        );

        let encoded = encode(&envelope).unwrap();
        let mut buf = BytesMut::from(&encoded[..]);
        let decoded = decode(&mut buf).unwrap().unwrap();

        assert_eq!(decoded, envelope);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_binary_roundtrip() {
        let envelope = Envelope::binary(
            SENDER_ID,
            "app-transport-1",
            "urn:x-cast:com.example.binary",
            Bytes::from_static(&[0x00, 0xFF, 0x10, 0x80]),
        );

        let encoded = encode(&envelope).unwrap();
        let mut buf = BytesMut::from(&encoded[..]);
        let decoded = decode(&mut buf).unwrap().unwrap();

        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_partial_frame_consumes_nothing() {
        let envelope = Envelope::to_receiver(ns::HEARTBEAT, json!({"type": "PING"}));
        let encoded = encode(&envelope).unwrap();

        // Feed the frame one byte short of complete
        let mut buf = BytesMut::from(&encoded[..encoded.len() - 1]);
        let before = buf.len();
        assert!(decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), before);

        // The final byte completes it
        buf.extend_from_slice(&encoded[encoded.len() - 1..]);
        let decoded = decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_short_length_prefix() {
        let mut buf = BytesMut::from(&[0u8, 0, 1][..]);
        assert!(decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_oversized_length_prefix_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32((MAX_FRAME_SIZE + 1) as u32);
        buf.extend_from_slice(&[0u8; 16]);

        match decode(&mut buf) {
            Err(Error::FrameTooLarge(len)) => assert_eq!(len, MAX_FRAME_SIZE + 1),
            other => panic!("expected FrameTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_two_frames_in_one_buffer() {
        let first = Envelope::to_receiver(ns::HEARTBEAT, json!({"type": "PING"}));
        let second = Envelope::to_receiver(ns::RECEIVER, json!({"type": "GET_STATUS"}));

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&encode(&first).unwrap());
        buf.extend_from_slice(&encode(&second).unwrap());

        assert_eq!(decode(&mut buf).unwrap().unwrap(), first);
        assert_eq!(decode(&mut buf).unwrap().unwrap(), second);
        assert!(decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_unknown_fields_skipped() {
        let envelope = Envelope::to_receiver(ns::RECEIVER, json!({"type": "GET_STATUS"}));
        let body = encode_body(&envelope).unwrap();

        // Append an unknown length-delimited field (tag 9) and an unknown
        // varint field (tag 10)
        let mut extended = BytesMut::from(&body[..]);
        put_bytes_field(&mut extended, 9, b"future");
        put_varint_field(&mut extended, 10, 42);

        let decoded = decode_body(&extended).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_missing_namespace_rejected() {
        let envelope = Envelope::to_receiver(ns::RECEIVER, json!({}));
        let body = encode_body(&envelope).unwrap();

        // Re-encode without the namespace field (field 4)
        let mut stripped = BytesMut::new();
        let mut rest: &[u8] = &body;
        while rest.has_remaining() {
            let before = rest;
            let key = get_varint(&mut rest).unwrap();
            let field = (key >> 3) as u32;
            let skipped = match key & 0x07 {
                0 => {
                    get_varint(&mut rest).unwrap();
                    &before[..before.len() - rest.len()]
                }
                2 => {
                    get_bytes(&mut rest).unwrap();
                    &before[..before.len() - rest.len()]
                }
                _ => unreachable!(),
            };
            if field != tag::NAMESPACE {
                stripped.extend_from_slice(skipped);
            }
        }

        match decode_body(&stripped) {
            Err(Error::MissingField(name)) => assert_eq!(name, "namespace"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_varint_boundaries() {
        for value in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut buf = BytesMut::new();
            put_varint(&mut buf, value);
            let mut slice: &[u8] = &buf;
            assert_eq!(get_varint(&mut slice).unwrap(), value);
            assert!(slice.is_empty());
        }
    }
}
