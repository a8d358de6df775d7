//! Errors from framed-endpoint I/O and session handling.

use thiserror::Error;

/// Errors raised by a [`crate::endpoint::FramedEndpoint`] or a wire
/// session. Timeout and connection-loss are distinct conditions
/// even though most callers handle them identically (log at DEBUG,
/// abandon the connection and retry next round).
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("operation timed out")]
    Timeout,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("string payload was not valid utf-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("job id mismatch: local={local}, peer={peer}")]
    JobIdMismatch { local: String, peer: String },

    #[error("unknown verb code {0}")]
    UnknownVerb(i64),

    #[error("unexpected verb: expected {expected:?}, got {got:?}")]
    UnexpectedVerb { expected: &'static str, got: crate::verbs::Verb },

    #[error("negative length prefix: {0}")]
    NegativeLength(i64),
}

impl ProtocolError {
    /// True for conditions classified as transient I/O: never fatal,
    /// logged at DEBUG, handled by closing and retrying on the next
    /// discovery round.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProtocolError::Timeout | ProtocolError::ConnectionClosed | ProtocolError::Io(_))
    }
}
