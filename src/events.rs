//! Uniform system events delivered to the application during `present`

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerPosition {
    pub x: i32,
    pub y: i32,
}

impl PointerPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ExitRequested,
    PointerMove,
    PointerDown,
    PointerUp,
}

/// What the application sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    ExitRequested,
    PointerMove(PointerPosition),
    PointerDown(PointerPosition),
    PointerUp(PointerPosition),
}

impl SystemEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SystemEvent::ExitRequested => EventKind::ExitRequested,
            SystemEvent::PointerMove(_) => EventKind::PointerMove,
            SystemEvent::PointerDown(_) => EventKind::PointerDown,
            SystemEvent::PointerUp(_) => EventKind::PointerUp,
        }
    }

    pub fn pointer(&self) -> Option<PointerPosition> {
        match *self {
            SystemEvent::ExitRequested => None,
            SystemEvent::PointerMove(p) | SystemEvent::PointerDown(p) | SystemEvent::PointerUp(p) => Some(p),
        }
    }
}

/// Raw input as a backend reports it. Touch devices send position and
/// button state as separate records, so either half may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    /// Window closed or Escape pressed
    Exit,
    /// Absolute axis update; an axis that did not change is None
    PointerAxis { x: Option<i32>, y: Option<i32> },
    /// Complete pointer position
    PointerMotion { x: i32, y: i32 },
    /// Button or touch contact, with a position if the backend knows one
    PointerButton { down: bool, at: Option<PointerPosition> },
}

pub type EventHandler = Box<dyn FnMut(&SystemEvent)>;

/// Turns backend events into `SystemEvent`s, remembering the last pointer
/// position so button events can carry coordinates.
#[derive(Default)]
pub struct EventBridge {
    handler: Option<EventHandler>,
    pointer: PointerPosition,
}

impl EventBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_handler(&mut self, handler: impl FnMut(&SystemEvent) + 'static) {
        self.handler = Some(Box::new(handler));
    }

    /// Last known pointer position
    pub fn pointer(&self) -> PointerPosition {
        self.pointer
    }

    fn translate(&mut self, event: BackendEvent) -> SystemEvent {
        match event {
            BackendEvent::Exit => SystemEvent::ExitRequested,
            BackendEvent::PointerAxis { x, y } => {
                if let Some(x) = x {
                    self.pointer.x = x;
                }
                if let Some(y) = y {
                    self.pointer.y = y;
                }
                SystemEvent::PointerMove(self.pointer)
            },
            BackendEvent::PointerMotion { x, y } => {
                self.pointer = PointerPosition::new(x, y);
                SystemEvent::PointerMove(self.pointer)
            },
            BackendEvent::PointerButton { down, at } => {
                if let Some(at) = at {
                    self.pointer = at;
                }
                if down {
                    SystemEvent::PointerDown(self.pointer)
                } else {
                    SystemEvent::PointerUp(self.pointer)
                }
            },
        }
    }

    /// Hand one event to the handler, if one is set
    pub fn emit(&mut self, event: SystemEvent) {
        if let Some(handler) = self.handler.as_mut() {
            handler(&event);
        }
    }

    /// Translate then emit each event, in order
    pub fn dispatch(&mut self, events: impl IntoIterator<Item = BackendEvent>) {
        for event in events {
            let event = self.translate(event);
            self.emit(event);
        }
    }
}

impl fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBridge")
            .field("has_handler", &self.handler.is_some())
            .field("pointer", &self.pointer)
            .finish()
    }
}
