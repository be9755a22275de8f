use crate::PeerId;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listen address could not be parsed.
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),

    /// Another host already listens on this address.
    #[error("address already in use: {0}")]
    AddressInUse(String),

    /// Discovery needs a non-empty service tag.
    #[error("invalid discovery service tag")]
    InvalidServiceTag,

    /// The local host has been shut down.
    #[error("host {0} is shut down")]
    HostClosed(PeerId),

    /// A host tried to connect to itself.
    #[error("cannot dial self")]
    DialSelf,

    /// Connecting to a remote peer failed.
    #[error("failed to connect to {peer}: {reason}")]
    ConnectionFailed {
        /// The peer we tried to reach.
        peer: PeerId,
        /// Why the attempt failed.
        reason: String,
    },

    /// This host already holds an open handle for the topic.
    #[error("topic {0} already joined")]
    TopicAlreadyJoined(String),

    /// The topic handle was closed.
    #[error("topic {0} is closed")]
    TopicClosed(String),

    /// The topic still has active subscriptions and cannot be closed.
    #[error("cannot close topic {0}: subscriptions still active")]
    TopicBusy(String),

    /// The subscription was cancelled; no further messages will arrive.
    #[error("subscription cancelled")]
    SubscriptionCancelled,
}
