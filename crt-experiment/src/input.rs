use crt_core::{Point, PointerEvent};
use crt_timing::Timer;
use std::time::Duration;

/// One polling cycle: the drained events in arrival order, the pointer
/// position at drain time and the drain timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub now: Duration,
    pub pointer: Point,
    pub events: Vec<PointerEvent>,
}

impl Cycle {
    pub fn new(now: Duration, pointer: Point, events: Vec<PointerEvent>) -> Self {
        Self {
            now,
            pointer,
            events,
        }
    }

    /// A cycle with no events, only a polled position.
    pub fn idle(now: Duration, pointer: Point) -> Self {
        Self::new(now, pointer, Vec::new())
    }

    pub fn has_quit(&self) -> bool {
        self.events.iter().any(PointerEvent::is_quit)
    }
}

/// Input adapter between the raw input source and the trial logic.
///
/// The source pushes moves, presses and quit requests as they arrive; each is
/// stamped with the session timer on push. The session drains one [`Cycle`]
/// per tick. Once quit has been pushed nothing else is accepted.
#[derive(Debug)]
pub struct EventQueue<T: Timer> {
    timer: T,
    pending: Vec<PointerEvent>,
    pointer: Point,
    quit: bool,
}

impl<T: Timer> EventQueue<T> {
    pub fn new(timer: T, initial_pointer: Point) -> Self {
        Self {
            timer,
            pending: Vec::with_capacity(64),
            pointer: initial_pointer,
            quit: false,
        }
    }

    pub fn push_move(&mut self, pos: Point) {
        let at = self.timer.now();
        self.push(PointerEvent::Move { pos, at });
    }

    pub fn push_press(&mut self, pos: Point) {
        let at = self.timer.now();
        self.push(PointerEvent::Press { pos, at });
    }

    pub fn push_quit(&mut self) {
        self.push(PointerEvent::Quit);
    }

    /// Pushes an already stamped event.
    pub fn push(&mut self, event: PointerEvent) {
        if self.quit {
            return;
        }
        if let Some(pos) = event.position() {
            self.pointer = pos;
        }
        self.quit = event.is_quit();
        self.pending.push(event);
    }

    pub fn drain(&mut self) -> Cycle {
        Cycle {
            now: self.timer.now(),
            pointer: self.pointer,
            events: std::mem::take(&mut self.pending),
        }
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }
}
