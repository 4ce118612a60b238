//! Transport trait definitions

use async_trait::async_trait;
use castlink_core::Envelope;

use crate::error::Result;

/// Connection lifecycle state of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    /// Trap state reached from Connecting/Connected on any I/O error
    Failed,
}

/// Events delivered by a transport's read side
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Socket and TLS handshake completed
    Connected,
    /// One decoded envelope read off the wire
    Message(Envelope),
    /// Terminal event, delivered exactly once per connection.
    /// `reason` is `None` for a locally requested teardown.
    Closed { reason: Option<String> },
}

/// Trait for writing envelopes to a connection
#[async_trait]
pub trait TransportSender: Send + Sync {
    /// Encode and send one envelope. Writes from concurrent callers are
    /// serialized; partial frames never interleave.
    async fn send(&self, envelope: Envelope) -> Result<()>;

    /// Current lifecycle state
    fn state(&self) -> TransportState;

    /// Request teardown; idempotent
    fn disconnect(&self);
}

/// Trait for receiving transport events
#[async_trait]
pub trait TransportReceiver: Send {
    /// Receive the next event; `None` after the terminal event was taken
    async fn recv(&mut self) -> Option<TransportEvent>;
}
