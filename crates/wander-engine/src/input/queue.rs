/// Logical movement keys. The host maps physical keys (WASD/QE, arrows) onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Forward,
    Back,
    YawLeft,
    YawRight,
    PitchUp,
    PitchDown,
}

impl Key {
    /// Decode the numeric key code sent by the host.
    pub fn from_code(code: u32) -> Option<Key> {
        match code {
            0 => Some(Key::Forward),
            1 => Some(Key::Back),
            2 => Some(Key::YawLeft),
            3 => Some(Key::YawRight),
            4 => Some(Key::PitchUp),
            5 => Some(Key::PitchDown),
            _ => None,
        }
    }
}

/// Input event types the engine understands.
/// Generic, no game-specific semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A touch/click began at normalized device coordinates (x, y in [-1, 1], y up).
    PointerDown { x: f32, y: f32 },
    /// Cursor moved to normalized device coordinates.
    PointerMove { x: f32, y: f32 },
    /// A logical key was pressed.
    KeyDown { key: Key },
    /// A logical key was released.
    KeyUp { key: Key },
    /// Scroll wheel / trackpad delta in pixels.
    Wheel { delta: f32 },
    /// Viewport resized (pixels).
    Resize { width: f32, height: f32 },
    /// A custom event from the UI layer (menu buttons, back buttons, etc.).
    /// `kind` identifies the event type; `a`, `b`, `c` carry arbitrary data.
    Custom { kind: u32, a: f32, b: f32, c: f32 },
    /// Text submitted by a UI form.
    Text { kind: u32, text: String },
    /// Completion of an asynchronous fetch issued by the host.
    Payload { key: String, body: Result<String, String> },
}

/// A queue of input events.
/// The host writes events into the queue; Rust reads and drains them each frame.
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
        }
    }

    /// Push a new input event (called from the host via wasm-bindgen).
    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drain all pending events. Returns a Vec and clears the queue.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    /// Iterate over pending events without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> {
        self.events.iter()
    }

    /// Check if there are pending events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}
