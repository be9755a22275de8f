//! Error types for the protocol layer.
//!
//! Each lanchat crate defines its own error enum. A `ProtocolError` always
//! means the problem is in turning envelopes into bytes or back, never in
//! networking or room lifecycle.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an envelope into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into an envelope).
    ///
    /// Common causes: malformed JSON, a missing required field, or a
    /// field of the wrong type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The bytes decoded, but the envelope breaks a rule serde cannot
    /// check (for example an empty message body).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
