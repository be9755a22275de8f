//! `ChatNode` builder: host, pub/sub, and discovery wired together.
//!
//! Everything here is fatal at startup. If the host cannot listen or
//! discovery cannot start, `build` fails and nothing is left running.

use std::sync::Arc;
use std::time::Duration;

use lanchat_room::RoomConfig;
use lanchat_session::{ChatView, HostConfig, SessionHost};
use lanchat_tick::TickConfig;
use lanchat_transport::{
    DiscoveryHandle, MemoryDiscovery, MemoryHost, MemoryNetwork, MemoryPubSub,
    NetworkHost, PeerId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{DiscoveryBridge, LanchatError};

/// Tag nodes advertise; only nodes with the same tag find each other.
pub const SERVICE_TAG: &str = "chat-for-the-bois";

/// Listen on whatever port is free.
pub const DEFAULT_LISTEN_ADDR: &str = "/memory/0";

/// How often discovery re-announces known peers.
pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(60 * 60);

const DISCOVERY_BUFFER: usize = 16;

/// Settings for a [`ChatNode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub listen_addr: String,
    pub service_tag: String,
    pub discovery_interval: Duration,
    pub room: RoomConfig,
    /// Peer-list refresh cadence on the chat page. Not serialized.
    #[serde(skip)]
    pub refresh: TickConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            service_tag: SERVICE_TAG.to_string(),
            discovery_interval: DISCOVERY_INTERVAL,
            room: RoomConfig::default(),
            refresh: TickConfig::default(),
        }
    }
}

/// Builder for a [`ChatNode`].
///
/// # Example
///
/// ```rust,ignore
/// let node = ChatNode::builder()
///     .network(network.clone())
///     .service_tag("my-lan")
///     .build()?;
/// let session = node.session(Arc::new(my_view));
/// ```
pub struct ChatNodeBuilder {
    config: NodeConfig,
    network: Option<MemoryNetwork>,
}

impl ChatNodeBuilder {
    pub fn new() -> Self {
        Self {
            config: NodeConfig::default(),
            network: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn listen_addr(mut self, addr: &str) -> Self {
        self.config.listen_addr = addr.to_string();
        self
    }

    pub fn service_tag(mut self, tag: &str) -> Self {
        self.config.service_tag = tag.to_string();
        self
    }

    pub fn discovery_interval(mut self, interval: Duration) -> Self {
        self.config.discovery_interval = interval;
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    pub fn refresh(mut self, refresh: TickConfig) -> Self {
        self.config.refresh = refresh;
        self
    }

    /// The network to join. Without one the node gets a private network
    /// and will never see another peer.
    pub fn network(mut self, network: MemoryNetwork) -> Self {
        self.network = Some(network);
        self
    }

    /// Creates the host, starts discovery, and starts the bridge.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Result<ChatNode, LanchatError> {
        let Self { config, network } = self;
        let network = network.unwrap_or_default();

        let host = Arc::new(network.create_host(&config.listen_addr)?);
        let pubsub = Arc::new(host.pubsub());

        let (tx, rx) = mpsc::channel(DISCOVERY_BUFFER);
        let discovery = match MemoryDiscovery::new(&host, &config.service_tag, config.discovery_interval)
            .start(tx)
        {
            Ok(handle) => handle,
            Err(e) => {
                host.shutdown();
                return Err(e.into());
            }
        };
        let bridge = DiscoveryBridge::new(Arc::clone(&host)).spawn(rx);

        info!(
            peer = %host.local_peer_id(),
            addrs = ?host.listen_addrs(),
            tag = %config.service_tag,
            "node started"
        );

        Ok(ChatNode {
            host,
            pubsub,
            discovery,
            bridge,
            config,
        })
    }
}

impl Default for ChatNodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running chat node.
pub struct ChatNode {
    host: Arc<MemoryHost>,
    pubsub: Arc<MemoryPubSub>,
    discovery: DiscoveryHandle,
    bridge: JoinHandle<()>,
    config: NodeConfig,
}

impl ChatNode {
    pub fn builder() -> ChatNodeBuilder {
        ChatNodeBuilder::new()
    }

    pub fn peer_id(&self) -> &PeerId {
        self.host.local_peer_id()
    }

    pub fn listen_addrs(&self) -> Vec<String> {
        self.host.listen_addrs()
    }

    pub fn host(&self) -> &Arc<MemoryHost> {
        &self.host
    }

    pub fn pubsub(&self) -> &Arc<MemoryPubSub> {
        &self.pubsub
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// A session host for one local user, reporting to `view`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn session<V: ChatView>(&self, view: Arc<V>) -> SessionHost<MemoryPubSub, V> {
        SessionHost::new(
            Arc::clone(&self.pubsub),
            self.peer_id().clone(),
            view,
            HostConfig {
                room: self.config.room.clone(),
                refresh: self.config.refresh.clone(),
            },
        )
    }

    /// Stops discovery and takes the host off the network.
    pub async fn shutdown(self) {
        self.discovery.stop();
        // The bridge ends once discovery drops its sender.
        if let Err(e) = self.bridge.await {
            warn!(error = %e, "discovery bridge failed");
        }
        self.host.shutdown();
        info!(peer = %self.host.local_peer_id(), "node stopped");
    }
}
