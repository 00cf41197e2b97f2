//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// Encoding errors wrap the codec's own error so callers deal with a
/// single type regardless of which codec produced it.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a notification into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (malformed or truncated bytes, wrong shape).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A room code supplied from outside is not well formed.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),
}
