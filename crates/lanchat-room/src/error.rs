//! Error types for the room layer.

use lanchat_protocol::ProtocolError;
use lanchat_transport::TransportError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The pub/sub layer refused a join, subscribe, publish, or close.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The outgoing envelope could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Publishing an empty message is not allowed.
    #[error("cannot publish an empty message")]
    EmptyMessage,
}
