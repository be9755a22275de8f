//! Wire protocol for lanchat.
//!
//! This crate defines what peers in a room actually exchange:
//!
//! - **Envelope** ([`ChatMessage`]): one chat message with its sender.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes are
//!   converted to and from the bytes the pub/sub layer carries.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw bytes on a topic)
//! and the room (typed message stream). It knows nothing about topics,
//! peers, or subscriptions.
//!
//! ```text
//! Transport (bytes) → Protocol (ChatMessage) → Room (message stream)
//! ```

mod codec;
mod error;
mod message;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::ChatMessage;
