//! Pages, profiles, and the name rules that gate moving between them.
//!
//! ```text
//!   Login ──(valid names)──→ RoomSelection ──(valid room)──→ Chat
//!                                  ↑                           │
//!                                  └────(leave / escape)───────┘
//! ```

use std::fmt;

use crate::SessionError;

/// Fewest characters accepted in a name.
pub const NAME_MIN_CHARS: usize = 3;

/// Most characters accepted in a name.
pub const NAME_MAX_CHARS: usize = 20;

/// Room name pre-filled on the room selection page.
pub const DEFAULT_ROOM_NAME: &str = "gen";

/// The page the UI is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Asks for first and last name.
    Login,
    /// Asks for a room name.
    RoomSelection,
    /// Message pane, peer list, and input line.
    Chat,
}

impl Page {
    /// Border title for the login and room selection pages.
    ///
    /// The chat page is titled after its room; see [`chat_title`].
    pub fn title(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::RoomSelection => "ROOM-SELECTION",
            Self::Chat => "CHAT",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Login => "login",
            Self::RoomSelection => "room selection",
            Self::Chat => "chat",
        };
        f.write_str(name)
    }
}

/// Title of the chat page for `room_name`.
pub fn chat_title(room_name: &str) -> String {
    format!("ROOM: {room_name}")
}

/// Which name input a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameField {
    FirstName,
    LastName,
    RoomName,
}

impl fmt::Display for NameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FirstName => "first name",
            Self::LastName => "last name",
            Self::RoomName => "room name",
        };
        f.write_str(name)
    }
}

/// Checks that `value` is 3 to 20 characters long.
///
/// Length is counted in Unicode scalar values, not bytes, so "Zoë" is
/// three characters.
pub fn validate_name(field: NameField, value: &str) -> Result<(), SessionError> {
    let len = value.chars().count();
    if (NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        Ok(())
    } else {
        Err(SessionError::InvalidName { field, len })
    }
}

/// The local user's identity as entered on the login page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    first_name: String,
    last_name: String,
}

impl Profile {
    /// Validates both names and builds a profile.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let first_name = first_name.into();
        let last_name = last_name.into();
        validate_name(NameField::FirstName, &first_name)?;
        validate_name(NameField::LastName, &last_name)?;
        Ok(Self {
            first_name,
            last_name,
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// The name stamped on outgoing messages: the first name.
    pub fn display_name(&self) -> &str {
        &self.first_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_length_bounds() {
        assert!(validate_name(NameField::RoomName, "ab").is_err());
        assert!(validate_name(NameField::RoomName, "abc").is_ok());
        assert!(validate_name(NameField::RoomName, &"a".repeat(20)).is_ok());
        assert!(validate_name(NameField::RoomName, &"a".repeat(21)).is_err());
        assert!(validate_name(NameField::RoomName, "").is_err());
    }

    #[test]
    fn test_name_length_counts_characters_not_bytes() {
        // 3 characters, 4 bytes.
        assert!(validate_name(NameField::FirstName, "Zoë").is_ok());
        // 20 characters, 40 bytes.
        assert!(validate_name(NameField::FirstName, &"é".repeat(20)).is_ok());
        // 2 characters, 8 bytes.
        assert!(validate_name(NameField::FirstName, "👋👋").is_err());
    }

    #[test]
    fn test_invalid_name_reports_field_and_length() {
        let err = validate_name(NameField::LastName, "Li").unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidName {
                field: NameField::LastName,
                len: 2
            }
        ));
        assert_eq!(
            err.to_string(),
            "last name must be 3 to 20 characters long (got 2)"
        );
    }

    #[test]
    fn test_profile_display_name_is_first_name() {
        let profile = Profile::new("Alice", "Liddell").unwrap();
        assert_eq!(profile.display_name(), "Alice");
        assert_eq!(profile.last_name(), "Liddell");
    }

    #[test]
    fn test_profile_checks_both_names() {
        assert!(matches!(
            Profile::new("Al", "Liddell"),
            Err(SessionError::InvalidName {
                field: NameField::FirstName,
                ..
            })
        ));
        assert!(matches!(
            Profile::new("Alice", "L"),
            Err(SessionError::InvalidName {
                field: NameField::LastName,
                ..
            })
        ));
    }

    #[test]
    fn test_titles() {
        assert_eq!(Page::Login.title(), "LOGIN");
        assert_eq!(Page::RoomSelection.title(), "ROOM-SELECTION");
        assert_eq!(chat_title("lobby"), "ROOM: lobby");
    }
}
