use serde::Serialize;

/// Unique identifier for a game-owned object (keyword, overlay element, card).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub u32);

/// A UI message queued for the host, already serialized as JSON.
/// Messages drive DOM chrome the engine does not render itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiMessage(pub String);

impl UiMessage {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
