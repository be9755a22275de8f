//! The chat message envelope: the only structure that travels on the wire.
//!
//! Every message a peer publishes into a room is one [`ChatMessage`],
//! serialized as a record with exactly three named fields:
//!
//! ```json
//! { "text": "hello", "senderID": "12D3KooW…", "senderName": "Alice" }
//! ```
//!
//! Unknown fields are ignored on decode, so newer peers can add fields
//! without breaking older ones. A missing field is a decode error, and the
//! receiving side drops such messages instead of surfacing them.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// One chat message, as published by its sender.
///
/// Constructed once at publish time and reconstructed by decoding on
/// every receiver. There are no setters: once built, an envelope is never
/// modified.
///
/// The `#[serde(rename = ...)]` attributes pin the wire names, which use
/// camelCase with an upper-case `ID`. Rust field names stay snake_case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The message body. Never empty.
    #[serde(rename = "text")]
    pub text: String,

    /// Stable identifier of the sending peer (its network identity,
    /// rendered as a string).
    #[serde(rename = "senderID")]
    pub sender_id: String,

    /// Human-chosen display name of the sender.
    #[serde(rename = "senderName")]
    pub sender_name: String,
}

impl ChatMessage {
    /// Builds a new envelope.
    pub fn new(
        text: impl Into<String>,
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
        }
    }

    /// Checks the rules serde cannot express.
    ///
    /// Serde already rejects records with a missing field. On top of that,
    /// an envelope with an empty body is malformed: nobody can publish one,
    /// so receiving one means the sender is not playing by the rules.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.text.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "message text is empty".into(),
            ));
        }
        Ok(())
    }

    /// Consumes the envelope, returning it only if [`validate`](Self::validate) passes.
    pub fn validated(self) -> Result<Self, ProtocolError> {
        self.validate()?;
        Ok(self)
    }
}
