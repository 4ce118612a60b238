//! Protocol message envelope
//!
//! One envelope is one protocol message unit: logical source/destination
//! endpoint ids, the namespace partitioning it to a channel, and a payload
//! that is either UTF-8 JSON text or raw bytes.

use bytes::Bytes;
use serde_json::Value;

use crate::{BROADCAST_ID, PROTOCOL_VERSION, RECEIVER_ID, SENDER_ID};

/// Envelope payload: JSON object or opaque binary blob
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// UTF-8 JSON text on the wire
    Json(Value),
    /// Raw bytes, passed through untouched
    Binary(Bytes),
}

impl Payload {
    /// The JSON value, if this is a JSON payload
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(v) => Some(v),
            Payload::Binary(_) => None,
        }
    }
}

/// One structured protocol message
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Logical source endpoint id (not a network address)
    pub source_id: String,
    /// Logical destination endpoint id; [`RECEIVER_ID`] is the platform,
    /// `*` is broadcast, anything else is a running app's transport id
    pub destination_id: String,
    /// Channel namespace this message belongs to
    pub namespace: String,
    /// JSON or binary payload
    pub payload: Payload,
    /// Wire protocol version
    pub protocol_version: i32,
}

impl Envelope {
    /// Create an envelope carrying a JSON payload
    pub fn json(
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        namespace: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            destination_id: destination_id.into(),
            namespace: namespace.into(),
            payload: Payload::Json(payload),
            protocol_version: PROTOCOL_VERSION,
        }
    }

    /// Create an envelope carrying a binary payload
    pub fn binary(
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        namespace: impl Into<String>,
        payload: Bytes,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            destination_id: destination_id.into(),
            namespace: namespace.into(),
            payload: Payload::Binary(payload),
            protocol_version: PROTOCOL_VERSION,
        }
    }

    /// Envelope from the default sender to the platform receiver
    pub fn to_receiver(namespace: impl Into<String>, payload: Value) -> Self {
        Self::json(SENDER_ID, RECEIVER_ID, namespace, payload)
    }

    /// Is this envelope addressed to everyone?
    pub fn is_broadcast(&self) -> bool {
        self.destination_id == BROADCAST_ID
    }
}
