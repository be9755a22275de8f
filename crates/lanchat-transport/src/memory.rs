//! In-process network implementing every transport seam.
//!
//! A [`MemoryNetwork`] is a registry of hosts living in the same process.
//! Hosts dial each other by address, join topics, and publish to the
//! subscribers of every host they are directly connected to. Delivery is
//! one hop: a message reaches the publisher's own subscribers and the
//! subscribers of its direct connections, nothing further.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::{
    NetworkHost, PeerId, PeerInfo, PubSub, RawMessage, Subscription, Topic,
    TransportError,
};

/// Scheme prefix of in-process listen addresses.
const ADDR_PREFIX: &str = "/memory/";

/// Counter for generating unique subscription IDs.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

type Inbox = mpsc::UnboundedSender<RawMessage>;

#[derive(Default)]
struct NetworkState {
    next_port: u64,
    hosts: HashMap<PeerId, HostState>,
}

struct HostState {
    addr: String,
    connections: BTreeSet<PeerId>,
    topics: HashMap<String, HashMap<u64, Inbox>>,
    service_tags: HashSet<String>,
}

impl NetworkState {
    fn allocate_port(&mut self) -> u64 {
        loop {
            self.next_port += 1;
            let addr = format!("{ADDR_PREFIX}{}", self.next_port);
            if !self.hosts.values().any(|h| h.addr == addr) {
                return self.next_port;
            }
        }
    }
}

/// A process-local network. Cheap to clone; clones share the same hosts.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new host with a random identity.
    ///
    /// `listen_addr` has the form `/memory/<port>`. Port `0` picks the next
    /// free port.
    pub fn create_host(
        &self,
        listen_addr: &str,
    ) -> Result<MemoryHost, TransportError> {
        let port: u64 = listen_addr
            .strip_prefix(ADDR_PREFIX)
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| TransportError::InvalidAddress(listen_addr.to_string()))?;

        let mut state = self.lock();
        let port = if port == 0 { state.allocate_port() } else { port };
        let addr = format!("{ADDR_PREFIX}{port}");
        if state.hosts.values().any(|h| h.addr == addr) {
            return Err(TransportError::AddressInUse(addr));
        }

        let peer_id = PeerId::random();
        state.hosts.insert(
            peer_id.clone(),
            HostState {
                addr: addr.clone(),
                connections: BTreeSet::new(),
                topics: HashMap::new(),
                service_tags: HashSet::new(),
            },
        );
        tracing::debug!(peer = %peer_id, %addr, "memory host listening");

        Ok(MemoryHost {
            network: self.clone(),
            peer_id,
            addr,
        })
    }

    /// Returns `true` if the two hosts hold a connection to each other.
    pub fn is_connected(&self, a: &PeerId, b: &PeerId) -> bool {
        self.lock()
            .hosts
            .get(a)
            .is_some_and(|h| h.connections.contains(b))
    }

    /// Drops the connection between two hosts, if any.
    pub fn disconnect(&self, a: &PeerId, b: &PeerId) {
        let mut state = self.lock();
        if let Some(host) = state.hosts.get_mut(a) {
            host.connections.remove(b);
        }
        if let Some(host) = state.hosts.get_mut(b) {
            host.connections.remove(a);
        }
    }

    fn peers_advertising(&self, tag: &str, except: &PeerId) -> Vec<PeerInfo> {
        self.lock()
            .hosts
            .iter()
            .filter(|(id, h)| *id != except && h.service_tags.contains(tag))
            .map(|(id, h)| PeerInfo {
                peer_id: id.clone(),
                addrs: vec![h.addr.clone()],
            })
            .collect()
    }

    fn set_advertised(&self, peer: &PeerId, tag: &str, on: bool) -> bool {
        let mut state = self.lock();
        let Some(host) = state.hosts.get_mut(peer) else {
            return false;
        };
        if on {
            host.service_tags.insert(tag.to_string());
        } else {
            host.service_tags.remove(tag);
        }
        true
    }

    fn unsubscribe(&self, peer: &PeerId, topic: &str, id: u64) {
        let mut state = self.lock();
        if let Some(subs) = state
            .hosts
            .get_mut(peer)
            .and_then(|h| h.topics.get_mut(topic))
        {
            subs.remove(&id);
        }
    }

    fn release_topic(&self, peer: &PeerId, topic: &str) {
        if let Some(host) = self.lock().hosts.get_mut(peer) {
            host.topics.remove(topic);
        }
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// A host registered on a [`MemoryNetwork`].
pub struct MemoryHost {
    network: MemoryNetwork,
    peer_id: PeerId,
    addr: String,
}

impl MemoryHost {
    /// This host's identity plus its dialable address.
    pub fn peer_info(&self) -> PeerInfo {
        PeerInfo {
            peer_id: self.peer_id.clone(),
            addrs: vec![self.addr.clone()],
        }
    }

    /// A pub/sub service bound to this host.
    pub fn pubsub(&self) -> MemoryPubSub {
        MemoryPubSub {
            network: self.network.clone(),
            peer_id: self.peer_id.clone(),
        }
    }

    /// Peers this host is currently connected to, sorted by ID.
    pub fn connected_peers(&self) -> Vec<PeerId> {
        self.network
            .lock()
            .hosts
            .get(&self.peer_id)
            .map(|h| h.connections.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes this host from the network, dropping all its connections
    /// and topics.
    pub fn shutdown(&self) {
        let mut state = self.network.lock();
        if let Some(host) = state.hosts.remove(&self.peer_id) {
            for peer in host.connections {
                if let Some(other) = state.hosts.get_mut(&peer) {
                    other.connections.remove(&self.peer_id);
                }
            }
            tracing::debug!(peer = %self.peer_id, "memory host shut down");
        }
    }

    fn connect_now(&self, peer: &PeerInfo) -> Result<(), TransportError> {
        if peer.peer_id == self.peer_id {
            return Err(TransportError::DialSelf);
        }

        let mut state = self.network.lock();
        if !state.hosts.contains_key(&self.peer_id) {
            return Err(TransportError::HostClosed(self.peer_id.clone()));
        }
        let target = state.hosts.get_mut(&peer.peer_id).ok_or_else(|| {
            TransportError::ConnectionFailed {
                peer: peer.peer_id.clone(),
                reason: "no route to peer".into(),
            }
        })?;
        if !peer.addrs.iter().any(|a| *a == target.addr) {
            return Err(TransportError::ConnectionFailed {
                peer: peer.peer_id.clone(),
                reason: "no reachable address".into(),
            });
        }

        target.connections.insert(self.peer_id.clone());
        if let Some(local) = state.hosts.get_mut(&self.peer_id) {
            local.connections.insert(peer.peer_id.clone());
        }
        Ok(())
    }
}

impl NetworkHost for MemoryHost {
    fn local_peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    fn listen_addrs(&self) -> Vec<String> {
        vec![self.addr.clone()]
    }

    async fn connect(&self, peer: &PeerInfo) -> Result<(), TransportError> {
        self.connect_now(peer)
    }
}

// ---------------------------------------------------------------------------
// Pub/sub
// ---------------------------------------------------------------------------

/// Pub/sub service of one [`MemoryHost`].
#[derive(Clone)]
pub struct MemoryPubSub {
    network: MemoryNetwork,
    peer_id: PeerId,
}

impl PubSub for MemoryPubSub {
    type Topic = MemoryTopic;

    fn join(&self, topic: &str) -> Result<MemoryTopic, TransportError> {
        let mut state = self.network.lock();
        let host = state
            .hosts
            .get_mut(&self.peer_id)
            .ok_or_else(|| TransportError::HostClosed(self.peer_id.clone()))?;
        if host.topics.contains_key(topic) {
            return Err(TransportError::TopicAlreadyJoined(topic.to_string()));
        }
        host.topics.insert(topic.to_string(), HashMap::new());

        Ok(MemoryTopic {
            network: self.network.clone(),
            peer_id: self.peer_id.clone(),
            name: topic.to_string(),
            closed: AtomicBool::new(false),
        })
    }

    fn list_peers(&self, topic: &str) -> Vec<PeerId> {
        let state = self.network.lock();
        let Some(host) = state.hosts.get(&self.peer_id) else {
            return Vec::new();
        };
        host.connections
            .iter()
            .filter(|peer| {
                state
                    .hosts
                    .get(*peer)
                    .is_some_and(|h| h.topics.contains_key(topic))
            })
            .cloned()
            .collect()
    }
}

/// A topic joined through [`MemoryPubSub`].
///
/// Dropping an open handle releases the topic, as if [`Topic::close`]
/// had been called.
pub struct MemoryTopic {
    network: MemoryNetwork,
    peer_id: PeerId,
    name: String,
    closed: AtomicBool,
}

impl MemoryTopic {
    fn deliver(&self, data: Vec<u8>) -> Result<usize, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::TopicClosed(self.name.clone()));
        }

        let state = self.network.lock();
        let host = state
            .hosts
            .get(&self.peer_id)
            .ok_or_else(|| TransportError::HostClosed(self.peer_id.clone()))?;

        let local = host.topics.get(&self.name).into_iter();
        let remote = host
            .connections
            .iter()
            .filter_map(|peer| state.hosts.get(peer))
            .filter_map(|h| h.topics.get(&self.name));

        let mut delivered = 0;
        for inbox in local.chain(remote).flat_map(|subs| subs.values()) {
            let msg = RawMessage {
                data: data.clone(),
                received_from: self.peer_id.clone(),
            };
            if inbox.send(msg).is_ok() {
                delivered += 1;
            }
        }
        Ok(delivered)
    }
}

impl Topic for MemoryTopic {
    type Subscription = MemorySubscription;

    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self) -> Result<MemorySubscription, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::TopicClosed(self.name.clone()));
        }

        let id = NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = self.network.lock();
            let subs = state
                .hosts
                .get_mut(&self.peer_id)
                .and_then(|h| h.topics.get_mut(&self.name))
                .ok_or_else(|| TransportError::TopicClosed(self.name.clone()))?;
            subs.insert(id, tx);
        }

        Ok(MemorySubscription {
            network: self.network.clone(),
            peer_id: self.peer_id.clone(),
            topic: self.name.clone(),
            id,
            inbox: tokio::sync::Mutex::new(rx),
            cancelled: AtomicBool::new(false),
            cancel_notify: Notify::new(),
        })
    }

    async fn publish(&self, data: Vec<u8>) -> Result<(), TransportError> {
        let delivered = self.deliver(data)?;
        tracing::trace!(topic = %self.name, delivered, "published");
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut state = self.network.lock();
        if let Some(host) = state.hosts.get_mut(&self.peer_id) {
            if host.topics.get(&self.name).is_some_and(|s| !s.is_empty()) {
                return Err(TransportError::TopicBusy(self.name.clone()));
            }
            host.topics.remove(&self.name);
        }
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl Drop for MemoryTopic {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.network.release_topic(&self.peer_id, &self.name);
        }
    }
}

/// A subscription created by [`MemoryTopic::subscribe`].
pub struct MemorySubscription {
    network: MemoryNetwork,
    peer_id: PeerId,
    topic: String,
    id: u64,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<RawMessage>>,
    cancelled: AtomicBool,
    cancel_notify: Notify,
}

impl Subscription for MemorySubscription {
    async fn next(&self) -> Result<RawMessage, TransportError> {
        // Register interest before checking the flag so a concurrent
        // cancel cannot slip between the two.
        let cancelled = self.cancel_notify.notified();
        if self.cancelled.load(Ordering::Acquire) {
            return Err(TransportError::SubscriptionCancelled);
        }

        let mut inbox = self.inbox.lock().await;
        tokio::select! {
            msg = inbox.recv() => msg.ok_or(TransportError::SubscriptionCancelled),
            () = cancelled => Err(TransportError::SubscriptionCancelled),
        }
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel_notify.notify_waiters();
        self.network.unsubscribe(&self.peer_id, &self.topic, self.id);
    }
}

impl Drop for MemorySubscription {
    fn drop(&mut self) {
        self.network.unsubscribe(&self.peer_id, &self.topic, self.id);
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Local discovery over a [`MemoryNetwork`].
///
/// Every host that starts discovery with the same service tag is
/// announced to the others: once when discovery starts, then again every
/// `interval`. Announcements repeat, so consumers must tolerate
/// duplicates.
pub struct MemoryDiscovery {
    network: MemoryNetwork,
    peer_id: PeerId,
    service_tag: String,
    interval: Duration,
}

impl MemoryDiscovery {
    /// Prepares discovery for `host` under `service_tag`.
    pub fn new(host: &MemoryHost, service_tag: &str, interval: Duration) -> Self {
        Self {
            network: host.network.clone(),
            peer_id: host.peer_id.clone(),
            service_tag: service_tag.to_string(),
            interval,
        }
    }

    /// Advertises this host and starts reporting discovered peers into
    /// `found`.
    ///
    /// The announcement task stops when `found` is closed or the returned
    /// handle is stopped or dropped.
    pub fn start(
        self,
        found: mpsc::Sender<PeerInfo>,
    ) -> Result<DiscoveryHandle, TransportError> {
        if self.service_tag.trim().is_empty() {
            return Err(TransportError::InvalidServiceTag);
        }
        if !self.network.set_advertised(&self.peer_id, &self.service_tag, true) {
            return Err(TransportError::HostClosed(self.peer_id));
        }

        tracing::info!(
            peer = %self.peer_id,
            tag = %self.service_tag,
            "discovery started"
        );

        let network = self.network.clone();
        let peer_id = self.peer_id.clone();
        let service_tag = self.service_tag.clone();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            loop {
                for peer in network.peers_advertising(&service_tag, &peer_id) {
                    if found.send(peer).await.is_err() {
                        return;
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });

        Ok(DiscoveryHandle {
            network: self.network,
            peer_id: self.peer_id,
            service_tag: self.service_tag,
            task,
        })
    }
}

/// Keeps a discovery service running. Stops it on drop.
pub struct DiscoveryHandle {
    network: MemoryNetwork,
    peer_id: PeerId,
    service_tag: String,
    task: JoinHandle<()>,
}

impl DiscoveryHandle {
    /// Stops announcing and stops advertising this host.
    pub fn stop(&self) {
        self.task.abort();
        self.network
            .set_advertised(&self.peer_id, &self.service_tag, false);
    }
}

impl Drop for DiscoveryHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
