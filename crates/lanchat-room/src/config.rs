//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default capacity of a room's inbound message channel.
pub const ROOM_BUFFER_SIZE: usize = 256;

/// Default namespace prefix for room topics.
pub const TOPIC_PREFIX: &str = "chat-room:";

/// Configuration shared by every room a node joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Capacity of the inbound message channel. When it is full the
    /// receive loop waits, which stalls delivery from this room's topic
    /// until the consumer catches up.
    pub buffer_size: usize,

    /// Prefix prepended to a room name to form its topic name.
    pub topic_prefix: String,

    /// How long `leave` waits for the receive loop to wind down before
    /// aborting it.
    pub leave_timeout: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            buffer_size: ROOM_BUFFER_SIZE,
            topic_prefix: TOPIC_PREFIX.to_string(),
            leave_timeout: Duration::from_secs(2),
        }
    }
}

impl RoomConfig {
    /// Fixes values that would break a room.
    ///
    /// A zero-capacity channel cannot be created, so `buffer_size` is
    /// raised to 1.
    pub fn validated(mut self) -> Self {
        if self.buffer_size == 0 {
            tracing::warn!("room buffer_size is 0, using 1");
            self.buffer_size = 1;
        }
        self
    }

    /// The topic name for `room_name` under this config's prefix.
    pub fn topic_for(&self, room_name: &str) -> String {
        format!("{}{}", self.topic_prefix, room_name)
    }
}
