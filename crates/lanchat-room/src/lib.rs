//! Chat room sessions for lanchat.
//!
//! A room is one joined pub/sub topic turned into a typed message stream.
//! Joining spawns a receive loop on its own Tokio task; the loop drains
//! the subscription into a bounded channel, dropping our own echoes and
//! anything that fails to decode.
//!
//! # Key types
//!
//! - [`ChatRoom`]: owns the subscription; the only thing that can leave
//! - [`RoomHandle`]: cheap clone for publishing and listing peers
//! - [`RoomConfig`]: buffer size, topic prefix, leave timeout

mod config;
mod error;
mod room;

pub use config::{RoomConfig, ROOM_BUFFER_SIZE, TOPIC_PREFIX};
pub use error::RoomError;
pub use room::{ChatRoom, MessageReceiver, RoomHandle};

/// Maps a room name to its topic name under the default prefix.
///
/// Deterministic, and injective: the prefix is fixed, so distinct room
/// names always yield distinct topics and every participant derives the
/// same topic for the same room.
pub fn topic_name(room_name: &str) -> String {
    format!("{TOPIC_PREFIX}{room_name}")
}
