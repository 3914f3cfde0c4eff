// Copyright 2026 the Stagehand Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input events.
//!
//! Events form a closed set of variants. Positional input arrives as
//! [`CursorEvent`]s keyed by [`CursorId`]; a mouse is cursor 0 by convention,
//! touch contacts and tracked blobs get their own ids from the input source.

use core::fmt;

use kurbo::Point;

use crate::node::NodeId;
use crate::time::HostTime;

/// Identifies one pointer: the mouse, a touch contact, a pen, a tracked blob.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CursorId(pub u32);

impl CursorId {
    /// The conventional id for the system mouse.
    pub const MOUSE: Self = Self(0);
}

impl fmt::Debug for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CursorId({})", self.0)
    }
}

/// Kind of device that produced a cursor event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputSourceKind {
    /// A mouse. Its cursor persists after a button release.
    Mouse,
    /// A touch contact.
    Touch,
    /// A stylus.
    Pen,
    /// A camera-tracked blob.
    Tracker,
}

/// What happened to a cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CursorEventKind {
    /// Button pressed or contact began.
    Down,
    /// Button released or contact ended.
    Up,
    /// Position changed.
    Motion,
    /// The cursor entered a node. Synthesized by the router.
    Over,
    /// The cursor left a node. Synthesized by the router.
    Out,
}

/// A positional input event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CursorEvent {
    /// What happened.
    pub kind: CursorEventKind,
    /// Which cursor.
    pub cursor: CursorId,
    /// Device family.
    pub source: InputSourceKind,
    /// Position in root coordinates.
    pub position: Point,
    /// When the device reported it.
    pub timestamp: HostTime,
    /// Node the event is addressed to, for `Over`/`Out`.
    pub target: Option<NodeId>,
}

impl CursorEvent {
    /// Creates an untargeted event.
    #[must_use]
    pub const fn new(
        kind: CursorEventKind,
        cursor: CursorId,
        source: InputSourceKind,
        position: Point,
    ) -> Self {
        Self {
            kind,
            cursor,
            source,
            position,
            timestamp: HostTime::ZERO,
            target: None,
        }
    }

    /// Shorthand for a mouse event on [`CursorId::MOUSE`].
    #[must_use]
    pub const fn mouse(kind: CursorEventKind, position: Point) -> Self {
        Self::new(kind, CursorId::MOUSE, InputSourceKind::Mouse, position)
    }

    /// Shorthand for a touch event.
    #[must_use]
    pub const fn touch(kind: CursorEventKind, cursor: CursorId, position: Point) -> Self {
        Self::new(kind, cursor, InputSourceKind::Touch, position)
    }

    /// Copy of this event with a different kind, addressed to `target`.
    #[must_use]
    pub const fn retarget(&self, kind: CursorEventKind, target: NodeId) -> Self {
        Self {
            kind,
            target: Some(target),
            ..*self
        }
    }

    /// Whether the pointer ceases to exist after this event.
    ///
    /// A mouse keeps hovering after its button is released; every other
    /// device loses its cursor when the contact ends.
    #[must_use]
    pub fn ends_cursor(&self) -> bool {
        self.kind == CursorEventKind::Up && self.source != InputSourceKind::Mouse
    }
}

/// Key codes the core itself interprets. Everything else is passed through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// The escape key.
    Escape,
    /// Any other key, by platform key code.
    Other(u32),
}

/// Press or release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyEventKind {
    /// Key pressed.
    Down,
    /// Key released.
    Up,
}

/// A keyboard event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Press or release.
    pub kind: KeyEventKind,
    /// Which key.
    pub key: KeyCode,
    /// When the device reported it.
    pub timestamp: HostTime,
}

impl KeyEvent {
    /// A key press.
    #[must_use]
    pub const fn down(key: KeyCode) -> Self {
        Self {
            kind: KeyEventKind::Down,
            key,
            timestamp: HostTime::ZERO,
        }
    }

    /// A key release.
    #[must_use]
    pub const fn up(key: KeyCode) -> Self {
        Self {
            kind: KeyEventKind::Up,
            key,
            timestamp: HostTime::ZERO,
        }
    }
}

/// Any event the router accepts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    /// Positional input.
    Cursor(CursorEvent),
    /// Keyboard input.
    Key(KeyEvent),
    /// The application was asked to quit (window closed, signal).
    Quit,
}

impl From<CursorEvent> for Event {
    fn from(e: CursorEvent) -> Self {
        Self::Cursor(e)
    }
}

impl From<KeyEvent> for Event {
    fn from(e: KeyEvent) -> Self {
        Self::Key(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_non_mouse_release_ends_cursor() {
        let p = Point::new(1.0, 2.0);
        assert!(!CursorEvent::mouse(CursorEventKind::Up, p).ends_cursor());
        assert!(CursorEvent::touch(CursorEventKind::Up, CursorId(4), p).ends_cursor());
        assert!(!CursorEvent::touch(CursorEventKind::Motion, CursorId(4), p).ends_cursor());
    }
}
