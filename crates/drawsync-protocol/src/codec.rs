//! Codec trait and implementations for turning notifications into bytes.
//!
//! The orchestrator hands typed [`Notification`](crate::Notification)s to
//! its broadcast sink. A sink that feeds a real transport needs bytes, and
//! the [`Codec`] trait is the seam that decides how they are produced.
//! [`JsonCodec`] is the only implementation today; clients read it
//! directly in browser DevTools.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because a codec lives inside sinks that are
/// shared across every room's timer task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented
    /// in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Behind the `json` feature (on by default).
///
/// ```rust
/// use drawsync_protocol::{Codec, JsonCodec, Notification};
///
/// let codec = JsonCodec;
/// let tick = Notification::Tick { remaining: 9 };
///
/// let bytes = codec.encode(&tick).unwrap();
/// let decoded: Notification = codec.decode(&bytes).unwrap();
/// assert_eq!(tick, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
