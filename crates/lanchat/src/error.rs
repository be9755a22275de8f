//! Unified error type for lanchat.

use lanchat_protocol::ProtocolError;
use lanchat_room::RoomError;
use lanchat_session::SessionError;
use lanchat_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `lanchat` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum LanchatError {
    /// Host, pub/sub, or discovery failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Envelope encode or decode failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Join, publish, or leave failure.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Page, name, or coordinator failure.
    #[error(transparent)]
    Session(#[from] SessionError),
}
