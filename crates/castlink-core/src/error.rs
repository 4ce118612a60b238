//! Error types for castlink-core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Error, Debug)]
pub enum Error {
    /// Declared frame length exceeds the sane maximum
    #[error("frame too large: {0} bytes (max {max})", max = crate::MAX_FRAME_SIZE)]
    FrameTooLarge(usize),

    /// Envelope body ended before a declared field did
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    /// Unknown wire field tag in the envelope body
    #[error("unknown field tag: {0}")]
    UnknownField(u32),

    /// A mandatory envelope field was absent
    #[error("missing envelope field: {0}")]
    MissingField(&'static str),

    /// Varint ran past its maximum width
    #[error("malformed varint")]
    MalformedVarint,

    /// Envelope field was not valid UTF-8
    #[error("invalid utf-8 in field {0}")]
    InvalidUtf8(&'static str),

    /// JSON payload failed to parse
    #[error("payload decode error: {0}")]
    Payload(String),

    /// Generic wire decode failure
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Payload(e.to_string())
    }
}
