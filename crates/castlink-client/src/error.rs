//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    /// The connection has ended; a fresh client is required per attempt
    #[error("connection closed")]
    ConnectionClosed,

    #[error("no inbound traffic within the liveness window")]
    HeartbeatTimeout,

    /// Receiver answered but the expected app entry was absent
    #[error("launch failed: {0}")]
    LaunchFailed(String),

    /// Receiver answered but the expected media session was absent
    #[error("load failed: {0}")]
    LoadFailed(String),

    /// Media control issued with no active media session
    #[error("no active media session")]
    NoMediaSession,

    /// Receiver-reported failure (LAUNCH_ERROR, INVALID_REQUEST)
    #[error("receiver error: {0}")]
    Receiver(String),

    /// The pending request was cancelled by disconnect or teardown
    #[error("request cancelled: {0}")]
    Cancelled(String),

    #[error("codec error: {0}")]
    Codec(#[from] castlink_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] castlink_transport::TransportError),
}
