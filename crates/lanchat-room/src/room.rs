//! Room session: one joined topic, one receive loop.
//!
//! [`ChatRoom::join`] subscribes to the room's topic and spawns a Tokio
//! task that owns the only sender of the inbound channel. The task is the
//! sole producer, so the channel closes exactly once: when the task
//! returns and its sender is dropped. Everything else (publishing,
//! listing peers) goes through a cheap [`RoomHandle`].

use std::sync::Arc;
use std::time::Duration;

use lanchat_protocol::{ChatMessage, Codec, JsonCodec};
use lanchat_transport::{PeerId, PubSub, Subscription, Topic};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::{RoomConfig, RoomError};

/// Receiving end of a room's inbound message stream.
///
/// Yields `None` once the room's receive loop has stopped.
pub type MessageReceiver = mpsc::Receiver<ChatMessage>;

type SubscriptionOf<P> = <<P as PubSub>::Topic as Topic>::Subscription;

struct RoomShared<P: PubSub> {
    room_name: String,
    self_id: PeerId,
    self_name: String,
    pubsub: Arc<P>,
    topic: P::Topic,
    codec: JsonCodec,
}

/// Handle for publishing into a joined room and listing its peers.
///
/// Cheap to clone. Handles cannot leave the room; only the owning
/// [`ChatRoom`] can.
pub struct RoomHandle<P: PubSub> {
    shared: Arc<RoomShared<P>>,
}

impl<P: PubSub> Clone for RoomHandle<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: PubSub> RoomHandle<P> {
    /// The room name as the user entered it.
    pub fn room_name(&self) -> &str {
        &self.shared.room_name
    }

    /// The topic this room is bound to.
    pub fn topic_name(&self) -> &str {
        self.shared.topic.name()
    }

    /// Our own peer identity.
    pub fn self_id(&self) -> &PeerId {
        &self.shared.self_id
    }

    /// Our display name, stamped on every message we publish.
    pub fn self_name(&self) -> &str {
        &self.shared.self_name
    }

    /// Publishes `text` into the room.
    ///
    /// Empty text is rejected before anything touches the network.
    pub async fn publish(&self, text: &str) -> Result<(), RoomError> {
        if text.is_empty() {
            return Err(RoomError::EmptyMessage);
        }

        let shared = &self.shared;
        let msg = ChatMessage::new(text, shared.self_id.as_str(), &shared.self_name);
        let bytes = shared.codec.encode(&msg)?;
        shared.topic.publish(bytes).await?;

        trace!(room = %shared.room_name, len = text.len(), "published message");
        Ok(())
    }

    /// Snapshot of the peers currently on this room's topic.
    pub fn list_peers(&self) -> Vec<PeerId> {
        self.shared.pubsub.list_peers(self.shared.topic.name())
    }
}

/// A joined chat room.
///
/// Owns the subscription and the receive loop. Dropping a `ChatRoom`
/// without calling [`leave`](Self::leave) still cancels the subscription,
/// but does not wait for the loop or close the topic explicitly.
pub struct ChatRoom<P: PubSub> {
    handle: RoomHandle<P>,
    subscription: Arc<SubscriptionOf<P>>,
    messages: Option<MessageReceiver>,
    reader: JoinHandle<()>,
    leave_timeout: Duration,
}

impl<P: PubSub> ChatRoom<P> {
    /// Joins `room_name` and starts receiving.
    ///
    /// Must be called from within a Tokio runtime. If subscribing fails,
    /// the freshly joined topic is released before the error is returned.
    pub fn join(
        pubsub: Arc<P>,
        self_id: PeerId,
        self_name: impl Into<String>,
        room_name: &str,
        config: &RoomConfig,
    ) -> Result<Self, RoomError> {
        let config = config.clone().validated();
        let topic_name = config.topic_for(room_name);

        let topic = pubsub.join(&topic_name)?;
        let subscription = match topic.subscribe() {
            Ok(sub) => Arc::new(sub),
            Err(e) => {
                if let Err(close_err) = topic.close() {
                    debug!(topic = %topic_name, error = %close_err, "close after failed subscribe");
                }
                return Err(e.into());
            }
        };

        let (tx, rx) = mpsc::channel(config.buffer_size);
        let reader = tokio::spawn(receive_loop(
            Arc::clone(&subscription),
            self_id.clone(),
            room_name.to_string(),
            JsonCodec,
            tx,
        ));

        info!(room = %room_name, topic = %topic_name, "joined room");

        Ok(Self {
            handle: RoomHandle {
                shared: Arc::new(RoomShared {
                    room_name: room_name.to_string(),
                    self_id,
                    self_name: self_name.into(),
                    pubsub,
                    topic,
                    codec: JsonCodec,
                }),
            },
            subscription,
            messages: Some(rx),
            reader,
            leave_timeout: config.leave_timeout,
        })
    }

    /// A cloneable handle for publishing and listing peers.
    pub fn handle(&self) -> RoomHandle<P> {
        self.handle.clone()
    }

    /// Takes the inbound message stream. Returns `None` after the first call.
    pub fn take_messages(&mut self) -> Option<MessageReceiver> {
        self.messages.take()
    }

    /// The room name as the user entered it.
    pub fn room_name(&self) -> &str {
        self.handle.room_name()
    }

    /// Publishes `text` into the room. See [`RoomHandle::publish`].
    pub async fn publish(&self, text: &str) -> Result<(), RoomError> {
        self.handle.publish(text).await
    }

    /// Snapshot of the peers on this room's topic.
    pub fn list_peers(&self) -> Vec<PeerId> {
        self.handle.list_peers()
    }

    /// Whether the receive loop is still running.
    pub fn is_receiving(&self) -> bool {
        !self.reader.is_finished()
    }

    /// Leaves the room.
    ///
    /// Cancels the subscription, releases the topic, and waits (bounded by
    /// the configured leave timeout) for the receive loop to finish. Once
    /// this returns, the inbound stream has ended or will end without
    /// yielding anything new.
    pub async fn leave(mut self) -> Result<(), RoomError> {
        self.subscription.cancel();
        // A loop parked on a full channel wakes up once the receiver is gone.
        drop(self.messages.take());

        let closed = self.handle.shared.topic.close();

        match tokio::time::timeout(self.leave_timeout, &mut self.reader).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(room = %self.room_name(), error = %e, "receive loop failed"),
            Err(_) => {
                warn!(room = %self.room_name(), "receive loop did not stop in time, aborting");
                self.reader.abort();
            }
        }

        info!(room = %self.room_name(), "left room");
        closed.map_err(RoomError::from)
    }
}

impl<P: PubSub> Drop for ChatRoom<P> {
    fn drop(&mut self) {
        self.subscription.cancel();
    }
}

/// Drains `subscription` into `tx` until the subscription ends or the
/// receiver goes away.
///
/// Our own echoes are dropped by transport sender and by envelope sender
/// ID. Payloads that fail to decode or validate are dropped too. A full
/// channel makes this loop wait.
async fn receive_loop<S: Subscription, C: Codec>(
    subscription: Arc<S>,
    self_id: PeerId,
    room: String,
    codec: C,
    tx: mpsc::Sender<ChatMessage>,
) {
    loop {
        let raw = match subscription.next().await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(room = %room, reason = %e, "subscription ended");
                break;
            }
        };

        if raw.received_from == self_id {
            continue;
        }

        let msg = match codec.decode(&raw.data) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(room = %room, from = %raw.received_from, error = %e, "dropping malformed message");
                continue;
            }
        };

        if msg.sender_id == self_id.as_str() {
            debug!(room = %room, from = %raw.received_from, "dropping relayed copy of our own message");
            continue;
        }

        if tx.send(msg).await.is_err() {
            debug!(room = %room, "message receiver dropped");
            break;
        }
    }
}
