//! Error types
//!
//! One enum per concern, folded into [`Error`] for callers that only need to
//! propagate.

use tokio_tungstenite::tungstenite;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("frame source error: {0}")]
    Source(#[from] SourceError),

    #[error("signaling error: {0}")]
    Signaling(#[from] SignalingError),

    #[error("media transport error: {0}")]
    Transport(#[from] TransportError),

    /// The hub loop has stopped and no longer accepts requests
    #[error("broadcast hub is closed")]
    HubClosed,

    #[error("keep-alive timed out after {missed} unanswered pings")]
    KeepaliveTimeout { missed: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Frame classification errors
///
/// Both are recoverable: the offending frame is dropped and the stream goes on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("not a vp9 frame (frame marker {marker:#04b})")]
    NotExpectedCodec { marker: u8 },

    #[error("frame too short: {len} bytes, need at least {min}")]
    Malformed { len: usize, min: usize },
}

/// Frame source (IVF container) errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad IVF signature: {0:?}")]
    BadSignature([u8; 4]),

    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("unsupported IVF header size: {0}")]
    UnsupportedHeaderSize(u16),

    #[error("frame size {size} exceeds limit {limit}")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("truncated {what}: expected {expected} bytes, got {got}")]
    Truncated {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Signaling channel errors
#[derive(Debug, thiserror::Error)]
pub enum SignalingError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unrecognized message: {0}")]
    Unrecognized(String),

    #[error("unexpected {0} message")]
    Unexpected(&'static str),
}

/// Media transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("remote candidate rejected: {0}")]
    Candidate(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("transport closed")]
    Closed,
}
