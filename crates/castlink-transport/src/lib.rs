//! Castlink Transport Layer
//!
//! One encrypted stream socket per receiver: TCP connect, TLS handshake
//! (receivers present self-signed certificates, so validation is relaxed by
//! deliberate protocol exception), a background read loop that decodes
//! length-prefixed frames into envelopes, and serialized writes.

pub mod error;
pub mod tls;
pub mod traits;

pub use error::{Result, TransportError};
pub use tls::{CastTransport, TlsConfig, TlsReceiver, TlsSender};
pub use traits::{TransportEvent, TransportReceiver, TransportSender, TransportState};
