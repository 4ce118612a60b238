//! Castlink Core
//!
//! Core types, encoding, and protocol primitives for the Cast wire protocol.
//!
//! This crate provides:
//! - The protocol message envelope ([`Envelope`], [`Payload`])
//! - Binary wire encoding/decoding with length-prefixed framing ([`codec`])
//! - JSON payload models for receiver and media status ([`payload`])
//! - Reserved endpoint ids and namespaces ([`ns`])

pub mod codec;
pub mod envelope;
pub mod error;
pub mod payload;

pub use codec::{decode, encode};
pub use envelope::{Envelope, Payload};
pub use error::{Error, Result};
pub use payload::{
    AppAvailability, CastApp, CastMediaStatus, CastStatus, MediaInfo, Volume,
};

/// Protocol version carried in every envelope (CASTV2 1.0)
pub const PROTOCOL_VERSION: i32 = 0;

/// TLS port receivers listen on
pub const DEFAULT_PORT: u16 = 8009;

/// mDNS service type receivers advertise
pub const MDNS_SERVICE_TYPE: &str = "_googlecast._tcp.local.";

/// Maximum wire frame size (guards against corrupt/hostile length prefixes)
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Default sender endpoint id
pub const SENDER_ID: &str = "sender-0";

/// Reserved endpoint id of the receiver platform itself
pub const RECEIVER_ID: &str = "receiver-0";

/// Broadcast endpoint id
pub const BROADCAST_ID: &str = "*";

/// Reserved channel namespaces
pub mod ns {
    /// Virtual-connection handshake (CONNECT/CLOSE)
    pub const CONNECTION: &str = "urn:x-cast:com.google.cast.tp.connection";
    /// Liveness (PING/PONG)
    pub const HEARTBEAT: &str = "urn:x-cast:com.google.cast.tp.heartbeat";
    /// Receiver control (GET_STATUS, LAUNCH, STOP, SET_VOLUME, GET_APP_AVAILABILITY)
    pub const RECEIVER: &str = "urn:x-cast:com.google.cast.receiver";
    /// Media control (GET_STATUS, LOAD, PLAY, PAUSE, STOP, SEEK)
    pub const MEDIA: &str = "urn:x-cast:com.google.cast.media";
}
