use crate::geometry::Point;
use std::time::Duration;

/// Canonical input event. Timestamps are offsets from the session clock origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Move { pos: Point, at: Duration },
    Press { pos: Point, at: Duration },
    Quit,
}

impl PointerEvent {
    pub fn position(&self) -> Option<Point> {
        match self {
            PointerEvent::Move { pos, .. } | PointerEvent::Press { pos, .. } => Some(*pos),
            PointerEvent::Quit => None,
        }
    }

    pub fn is_quit(&self) -> bool {
        matches!(self, PointerEvent::Quit)
    }
}
