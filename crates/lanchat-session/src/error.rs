//! Error types for the session layer.

use lanchat_room::RoomError;

use crate::{NameField, Page};

/// Errors reported by the session host and the event coordinator.
///
/// All of these are recoverable: the host hands them to
/// [`ChatView::error`](crate::ChatView::error) and keeps serving requests.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A first name, last name, or room name is too short or too long.
    #[error("{field} must be {min} to {max} characters long (got {len})",
        min = crate::NAME_MIN_CHARS, max = crate::NAME_MAX_CHARS)]
    InvalidName {
        /// Which input was rejected.
        field: NameField,
        /// Its length in characters.
        len: usize,
    },

    /// A room was requested before a profile was saved.
    #[error("log in before joining a room")]
    NotLoggedIn,

    /// The request makes no sense on the page currently shown.
    #[error("cannot {request} on the {page} page")]
    WrongPage {
        /// What was asked for.
        request: &'static str,
        /// The page that was showing.
        page: Page,
    },

    /// Joining, publishing, or leaving failed in the room layer.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The active room's message stream ended without a leave.
    #[error("room {0} stopped delivering messages")]
    RoomClosed(String),

    /// The event coordinator is no longer running.
    #[error("event coordinator has stopped")]
    CoordinatorStopped,
}
