//! Turning envelopes into topic payloads and back.
//!
//! The pub/sub layer only moves opaque byte payloads. A [`Codec`] converts
//! a [`ChatMessage`] into those bytes on the sending side and back on every
//! receiver. Decoding also applies [`ChatMessage::validate`], so whatever a
//! codec hands back is an envelope a room can deliver as is.

use crate::{ChatMessage, ProtocolError};

/// Wire format for chat envelopes.
///
/// A room's receive loop owns its codec for the room's whole lifetime, on
/// its own task, hence the `Send + Sync + 'static` bound.
pub trait Codec: Send + Sync + 'static {
    /// Serializes an envelope for publishing.
    fn encode(&self, msg: &ChatMessage) -> Result<Vec<u8>, ProtocolError>;

    /// Reads an envelope from a received payload.
    ///
    /// # Errors
    /// `ProtocolError::Decode` for bytes that are not an envelope at all,
    /// `ProtocolError::InvalidMessage` for an envelope that breaks a rule
    /// (an empty body).
    fn decode(&self, data: &[u8]) -> Result<ChatMessage, ProtocolError>;
}

/// JSON envelopes, the format every lanchat peer speaks.
///
/// A captured payload can be read by eye. Behind the `json` feature flag
/// (on by default).
///
/// ```rust
/// use lanchat_protocol::{ChatMessage, Codec, JsonCodec};
///
/// let msg = ChatMessage::new("hello", "peer-1", "Alice");
/// let bytes = JsonCodec.encode(&msg).unwrap();
/// assert_eq!(JsonCodec.decode(&bytes).unwrap(), msg);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode(&self, msg: &ChatMessage) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(msg).map_err(ProtocolError::Encode)
    }

    fn decode(&self, data: &[u8]) -> Result<ChatMessage, ProtocolError> {
        serde_json::from_slice::<ChatMessage>(data)
            .map_err(ProtocolError::Decode)?
            .validated()
    }
}
