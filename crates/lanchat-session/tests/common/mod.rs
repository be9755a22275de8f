//! Shared test doubles: a view that records every call and a pub/sub
//! wrapper that counts what reaches the transport.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lanchat_protocol::ChatMessage;
use lanchat_session::{ChatView, Page, SessionError};
use lanchat_transport::{
    MemoryHost, MemoryNetwork, MemoryPubSub, MemorySubscription, MemoryTopic,
    NetworkHost, PeerId, PubSub, Topic, TransportError,
};

// =========================================================================
// RecordingView
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Incoming { text: String, sender_name: String },
    Outgoing { text: String, self_name: String },
    Peers(Vec<String>),
    Error(String),
    Page(Page, String),
    Cleared,
}

#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
    redraws: AtomicUsize,
}

impl RecordingView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn incoming(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Incoming { text, sender_name } => Some((text, sender_name)),
                _ => None,
            })
            .collect()
    }

    pub fn outgoing(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Outgoing { text, self_name } => Some((text, self_name)),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Error(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn peer_updates(&self) -> Vec<Vec<String>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Peers(peers) => Some(peers),
                _ => None,
            })
            .collect()
    }

    pub fn last_page(&self) -> Option<(Page, String)> {
        self.events().into_iter().rev().find_map(|e| match e {
            ViewEvent::Page(page, title) => Some((page, title)),
            _ => None,
        })
    }

    pub fn redraws(&self) -> usize {
        self.redraws.load(Ordering::SeqCst)
    }

    /// Polls until `check` passes, for up to a second of real time.
    pub async fn wait_until(&self, check: impl Fn(&[ViewEvent]) -> bool) -> bool {
        for _ in 0..100 {
            if check(&self.events()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ChatView for RecordingView {
    fn incoming_message(&self, msg: &ChatMessage) {
        self.push(ViewEvent::Incoming {
            text: msg.text.clone(),
            sender_name: msg.sender_name.clone(),
        });
    }

    fn outgoing_message(&self, text: &str, self_name: &str) {
        self.push(ViewEvent::Outgoing {
            text: text.to_string(),
            self_name: self_name.to_string(),
        });
    }

    fn peers_updated(&self, peers: &[String]) {
        self.push(ViewEvent::Peers(peers.to_vec()));
    }

    fn error(&self, err: &SessionError) {
        self.push(ViewEvent::Error(err.to_string()));
    }

    fn switch_page(&self, page: Page, title: &str) {
        self.push(ViewEvent::Page(page, title.to_string()));
    }

    fn clear_messages(&self) {
        self.push(ViewEvent::Cleared);
    }

    fn request_redraw(&self) {
        self.redraws.fetch_add(1, Ordering::SeqCst);
    }
}

// =========================================================================
// CountingPubSub
// =========================================================================

/// Counters shared between a [`CountingPubSub`] and its topics.
#[derive(Default)]
pub struct Counters {
    pub list_peers: AtomicUsize,
    pub publishes: AtomicUsize,
    pub fail_publish: AtomicBool,
}

impl Counters {
    pub fn list_peers(&self) -> usize {
        self.list_peers.load(Ordering::SeqCst)
    }

    pub fn publishes(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }
}

pub struct CountingPubSub {
    inner: MemoryPubSub,
    pub counters: Arc<Counters>,
}

impl CountingPubSub {
    pub fn new(host: &MemoryHost) -> Self {
        Self {
            inner: host.pubsub(),
            counters: Arc::new(Counters::default()),
        }
    }
}

pub struct CountingTopic {
    inner: MemoryTopic,
    counters: Arc<Counters>,
}

impl PubSub for CountingPubSub {
    type Topic = CountingTopic;

    fn join(&self, topic: &str) -> Result<CountingTopic, TransportError> {
        Ok(CountingTopic {
            inner: self.inner.join(topic)?,
            counters: Arc::clone(&self.counters),
        })
    }

    fn list_peers(&self, topic: &str) -> Vec<PeerId> {
        self.counters.list_peers.fetch_add(1, Ordering::SeqCst);
        self.inner.list_peers(topic)
    }
}

impl Topic for CountingTopic {
    type Subscription = MemorySubscription;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn subscribe(&self) -> Result<MemorySubscription, TransportError> {
        self.inner.subscribe()
    }

    async fn publish(&self, data: Vec<u8>) -> Result<(), TransportError> {
        if self.counters.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::TopicClosed(self.name().to_string()));
        }
        self.counters.publishes.fetch_add(1, Ordering::SeqCst);
        self.inner.publish(data).await
    }

    fn close(&self) -> Result<(), TransportError> {
        self.inner.close()
    }
}

// =========================================================================
// Network helpers
// =========================================================================

pub fn host(net: &MemoryNetwork) -> MemoryHost {
    net.create_host("/memory/0").unwrap()
}

pub async fn connect(a: &MemoryHost, b: &MemoryHost) {
    a.connect(&b.peer_info()).await.unwrap();
}
