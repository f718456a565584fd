//! Input abstraction layer.
//!
//! Normalizes pointer and keyboard events from the host toolkit into a
//! unified `InputEvent` enum consumed by the gesture controller and the
//! session. Positions are in tree-view coordinates.

/// Which pointer button an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Left mouse button, touch contact, pen tip.
    Primary,
    Secondary,
    Middle,
}

/// Modifier keys held during a pointer event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    /// Ctrl on most platforms, ⌘ on macOS: toggles an item in the selection.
    pub fn toggles(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed over a tree item.
    PointerDown {
        x: f32,
        y: f32,
        button: PointerButton,
        modifiers: Modifiers,
        /// Monotonic timestamp, used for double-click detection.
        time_ms: u64,
    },

    /// Pointer moved.
    PointerMove { x: f32, y: f32 },

    /// Pointer released.
    PointerUp {
        x: f32,
        y: f32,
        button: PointerButton,
    },

    /// Key pressed while a tree item has focus.
    Key {
        key: String,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
    },
}

impl InputEvent {
    pub fn press(x: f32, y: f32, time_ms: u64) -> Self {
        Self::press_with(x, y, Modifiers::NONE, time_ms)
    }

    /// Primary press with modifier keys held.
    pub fn press_with(x: f32, y: f32, modifiers: Modifiers, time_ms: u64) -> Self {
        Self::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
            modifiers,
            time_ms,
        }
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self::PointerMove { x, y }
    }

    pub fn release(x: f32, y: f32) -> Self {
        Self::PointerUp {
            x,
            y,
            button: PointerButton::Primary,
        }
    }

    /// An unmodified key press.
    pub fn key(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<(f32, f32)> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y }
            | Self::PointerUp { x, y, .. } => Some((*x, *y)),
            Self::Key { .. } => None,
        }
    }
}
