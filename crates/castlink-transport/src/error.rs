//! Transport error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("tls handshake failed: {0}")]
    Tls(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("not connected")]
    NotConnected,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("connect timed out")]
    Timeout,

    #[error("framing error: {0}")]
    Framing(#[from] castlink_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<native_tls::Error> for TransportError {
    fn from(e: native_tls::Error) -> Self {
        TransportError::Tls(e.to_string())
    }
}
