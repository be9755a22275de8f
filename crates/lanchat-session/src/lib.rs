//! Chat sessions for lanchat: the part between the UI and the rooms.
//!
//! 1. **Pages and names**: [`Page`], [`Profile`], 3 to 20 character names
//! 2. **Forms**: [`LoginForm`] and [`RoomForm`], reset field by field
//!    through [`Resettable`]
//! 3. **Event coordinator**: one task that publishes typed lines, shows
//!    incoming messages, and refreshes the peer list ([`coordinator`])
//! 4. **Session host**: applies [`UiRequest`]s and owns the active room
//!    ([`SessionHost`])
//!
//! # How it fits in the stack
//!
//! ```text
//! UI (above)             ← implements ChatView, sends UiRequests
//!     ↕
//! Session (this crate)   ← pages, coordinator, at most one active room
//!     ↕
//! Room (below)           ← ChatRoom, RoomHandle, receive loop
//! ```

pub mod coordinator;
mod error;
pub mod forms;
mod host;
mod page;
mod view;

pub use coordinator::{CoordinatorHandle, CoordinatorState, ShutdownSignal};
pub use error::SessionError;
pub use forms::{Form, LoginForm, Resettable, RoomForm, TextField, Toggle};
pub use host::{HostConfig, SessionHost, UiRequest, QUIT_COMMAND};
pub use page::{
    chat_title, validate_name, NameField, Page, Profile, DEFAULT_ROOM_NAME,
    NAME_MAX_CHARS, NAME_MIN_CHARS,
};
pub use view::{
    colour, format_incoming, format_outgoing, short_ids, strip_markup, ChatView,
};
