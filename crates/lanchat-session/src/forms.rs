//! Form state for the login and room selection pages.
//!
//! Each field kind knows how to put itself back to its initial state via
//! [`Resettable`], so a form resets by walking its fields without caring
//! what kind each one is.

/// A form field that can be put back to its initial state.
pub trait Resettable {
    fn reset(&mut self);
}

/// A single-line text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    label: &'static str,
    initial: String,
    value: String,
}

impl TextField {
    pub fn new(label: &'static str, initial: impl Into<String>) -> Self {
        let initial = initial.into();
        Self {
            label,
            value: initial.clone(),
            initial,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

impl Resettable for TextField {
    fn reset(&mut self) {
        self.value.clone_from(&self.initial);
    }
}

/// A checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    label: &'static str,
    initial: bool,
    checked: bool,
}

impl Toggle {
    pub fn new(label: &'static str, initial: bool) -> Self {
        Self {
            label,
            initial,
            checked: initial,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn set(&mut self, checked: bool) {
        self.checked = checked;
    }
}

impl Resettable for Toggle {
    fn reset(&mut self) {
        self.checked = self.initial;
    }
}

/// A form is a fixed set of resettable fields.
pub trait Form {
    /// Every field of the form, in display order.
    fn fields_mut(&mut self) -> Vec<&mut dyn Resettable>;

    /// Resets every field.
    fn reset(&mut self) {
        for field in self.fields_mut() {
            field.reset();
        }
    }
}

/// The login page.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub first_name: TextField,
    pub last_name: TextField,
    /// "Under development. Still wish to proceed?" Checked by default.
    pub proceed: Toggle,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            first_name: TextField::new("First Name:", ""),
            last_name: TextField::new("Last Name:", ""),
            proceed: Toggle::new("Under development. Still wish to proceed?", true),
        }
    }
}

impl Form for LoginForm {
    fn fields_mut(&mut self) -> Vec<&mut dyn Resettable> {
        vec![&mut self.first_name, &mut self.last_name, &mut self.proceed]
    }
}

/// The room selection page.
#[derive(Debug, Clone)]
pub struct RoomForm {
    pub room_name: TextField,
}

impl Default for RoomForm {
    fn default() -> Self {
        Self {
            room_name: TextField::new("Room Name:", crate::DEFAULT_ROOM_NAME),
        }
    }
}

impl Form for RoomForm {
    fn fields_mut(&mut self) -> Vec<&mut dyn Resettable> {
        vec![&mut self.room_name]
    }
}
