//! Transport seams for lanchat.
//!
//! lanchat does not implement a gossip protocol or a discovery protocol
//! itself. It talks to them through the traits in this crate:
//!
//! - [`NetworkHost`]: the local node; can dial a discovered peer.
//! - [`PubSub`]: joins named topics and lists the peers on a topic.
//! - [`Topic`]: a joined topic; subscribe, publish bytes, close.
//! - [`Subscription`]: the inbound side of a topic; yields [`RawMessage`]s
//!   until cancelled.
//!
//! # Feature Flags
//!
//! - `memory` (default): an in-process network ([`MemoryNetwork`]) that
//!   implements every seam. Hosts created from the same network can
//!   discover, connect to, and publish to each other without sockets.

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::TransportError;
#[cfg(feature = "memory")]
pub use memory::{
    DiscoveryHandle, MemoryDiscovery, MemoryHost, MemoryNetwork,
    MemoryPubSub, MemorySubscription, MemoryTopic,
};

use std::fmt;
use std::future::Future;

use rand::Rng;

/// Alphabet used for textual peer identities (base58, as multihash IDs are).
const PEER_ID_ALPHABET: &[u8] =
    b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Prefix shared by Ed25519-derived peer IDs.
const PEER_ID_PREFIX: &str = "12D3KooW";

/// Number of random characters after the prefix.
const PEER_ID_RANDOM_LEN: usize = 44;

/// How many trailing characters [`PeerId::short`] keeps.
pub const SHORT_ID_LEN: usize = 10;

/// Opaque, stable identity of a peer on the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    /// Wraps an existing textual identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identity.
    pub fn random() -> Self {
        let mut rng = rand::rng();
        let mut id = String::with_capacity(PEER_ID_PREFIX.len() + PEER_ID_RANDOM_LEN);
        id.push_str(PEER_ID_PREFIX);
        for _ in 0..PEER_ID_RANDOM_LEN {
            let idx = rng.random_range(0..PEER_ID_ALPHABET.len());
            id.push(PEER_ID_ALPHABET[idx] as char);
        }
        Self(id)
    }

    /// The full textual identity.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last [`SHORT_ID_LEN`] characters, for compact display.
    ///
    /// IDs shorter than that are returned whole.
    pub fn short(&self) -> &str {
        let count = self.0.chars().count();
        if count <= SHORT_ID_LEN {
            return &self.0;
        }
        let start = self
            .0
            .char_indices()
            .nth(count - SHORT_ID_LEN)
            .map_or(0, |(idx, _)| idx);
        &self.0[start..]
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A peer's identity together with the addresses it can be dialed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// Who the peer is.
    pub peer_id: PeerId,
    /// Where the peer listens.
    pub addrs: Vec<String>,
}

/// One message as delivered by a subscription.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// The encoded payload exactly as it was published.
    pub data: Vec<u8>,
    /// The peer that handed us this message. Equal to our own ID for
    /// messages we published ourselves.
    pub received_from: PeerId,
}

/// The local network node.
pub trait NetworkHost: Send + Sync + 'static {
    /// This node's identity.
    fn local_peer_id(&self) -> &PeerId;

    /// Addresses this node listens on.
    fn listen_addrs(&self) -> Vec<String>;

    /// Opens a connection to a remote peer.
    ///
    /// Connecting to a peer that is already connected succeeds.
    fn connect(
        &self,
        peer: &PeerInfo,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// A publish/subscribe service bound to one host.
pub trait PubSub: Send + Sync + 'static {
    /// The handle type for a joined topic.
    type Topic: Topic;

    /// Joins a topic, returning the handle used to subscribe and publish.
    ///
    /// A host may hold at most one open handle per topic name.
    fn join(&self, topic: &str) -> Result<Self::Topic, TransportError>;

    /// Point-in-time snapshot of the peers known on a topic.
    ///
    /// Order is implementation-defined.
    fn list_peers(&self, topic: &str) -> Vec<PeerId>;
}

/// A joined topic.
pub trait Topic: Send + Sync + 'static {
    /// The inbound side of this topic.
    type Subscription: Subscription;

    /// The topic name this handle was joined with.
    fn name(&self) -> &str;

    /// Starts receiving messages published on this topic.
    fn subscribe(&self) -> Result<Self::Subscription, TransportError>;

    /// Broadcasts a payload to every subscriber of the topic.
    fn publish(
        &self,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Releases the topic. Fails while subscriptions are still active.
    fn close(&self) -> Result<(), TransportError>;
}

/// The inbound message stream of a topic.
///
/// Both methods take `&self` so one task can block in [`next`](Self::next)
/// while another calls [`cancel`](Self::cancel).
pub trait Subscription: Send + Sync + 'static {
    /// Waits for the next message.
    ///
    /// Returns an error once the subscription is cancelled or the
    /// underlying topic goes away. After the first error, every later
    /// call errors as well.
    fn next(
        &self,
    ) -> impl Future<Output = Result<RawMessage, TransportError>> + Send;

    /// Stops the subscription. Any pending or future `next` fails.
    ///
    /// Calling it more than once has no further effect.
    fn cancel(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_peer_ids_are_distinct() {
        let a = PeerId::random();
        let b = PeerId::random();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with(PEER_ID_PREFIX));
        assert_eq!(a.as_str().len(), PEER_ID_PREFIX.len() + PEER_ID_RANDOM_LEN);
    }

    #[test]
    fn test_short_keeps_last_ten_chars() {
        let id = PeerId::new("12D3KooWabcdefghijKLMNOPQRST");
        assert_eq!(id.short(), "KLMNOPQRST");
    }

    #[test]
    fn test_short_of_short_id_is_whole_id() {
        let id = PeerId::new("abc");
        assert_eq!(id.short(), "abc");
        let exact = PeerId::new("0123456789");
        assert_eq!(exact.short(), "0123456789");
    }

    #[test]
    fn test_short_is_char_boundary_safe() {
        let id = PeerId::new("ééééééééééééé");
        assert_eq!(id.short().chars().count(), SHORT_ID_LEN);
    }

    #[test]
    fn test_display_is_full_id() {
        let id = PeerId::new("12D3KooWxyz");
        assert_eq!(id.to_string(), "12D3KooWxyz");
    }

    #[test]
    fn test_peer_id_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(PeerId::new("a"), "alice");
        map.insert(PeerId::new("b"), "bob");
        assert_eq!(map[&PeerId::new("a")], "alice");
    }
}
