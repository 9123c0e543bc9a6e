//! Screen-space overlay elements (titles, sentences, panels).
//!
//! The host owns the DOM; the field only tracks what exists, its animated
//! properties, and announces creation/removal through messages.

use glam::Vec3;
use serde::Serialize;
use wander_engine::{ElementInstance, EntityId};

use crate::messages::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    LandingTitle,
    Sentence,
    Glyph,
    TitleWord,
    Blur,
    ScrollHint,
    DetailPanel,
    DetailBack,
    DetailHeader,
    DetailBody,
    Help,
    FinaleWord,
    FinaleMessage,
    FinaleLine,
}

impl ElementKind {
    pub fn code(self) -> f32 {
        self as u32 as f32
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: EntityId,
    pub kind: ElementKind,
    pub text: String,
    /// Pixel offset from the element's laid-out position.
    pub offset: Vec3,
    pub scale: f32,
    pub opacity: f32,
    pub rotation: f32,
}

#[derive(Debug, Default)]
pub struct Overlays {
    elements: Vec<Element>,
    outbox: Vec<Message>,
}

impl Overlays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hidden element. `parent`/`index` place glyphs inside their sentence.
    pub fn create(
        &mut self,
        id: EntityId,
        kind: ElementKind,
        text: &str,
        parent: Option<EntityId>,
        index: usize,
    ) -> EntityId {
        self.elements.push(Element {
            id,
            kind,
            text: text.to_string(),
            offset: Vec3::ZERO,
            scale: 1.0,
            opacity: 0.0,
            rotation: 0.0,
        });
        self.outbox.push(Message::ElementCreated { id, kind, text: text.to_string(), parent, index });
        id
    }

    pub fn set_text(&mut self, id: EntityId, text: &str) {
        if let Some(e) = self.get_mut(id) {
            e.text = text.to_string();
            self.outbox.push(Message::ElementText { id, text: text.to_string() });
        }
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        let before = self.elements.len();
        self.elements.retain(|e| e.id != id);
        let removed = before != self.elements.len();
        if removed {
            self.outbox.push(Message::ElementRemoved { id });
        }
        removed
    }

    pub fn remove_kind(&mut self, kind: ElementKind) {
        let ids: Vec<EntityId> = self.elements.iter().filter(|e| e.kind == kind).map(|e| e.id).collect();
        for id in ids {
            self.remove(id);
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    pub fn of_kind(&self, kind: ElementKind) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(move |e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn instances(&self) -> impl Iterator<Item = ElementInstance> + '_ {
        self.elements.iter().map(|e| ElementInstance {
            id: e.id.0 as f32,
            x: e.offset.x,
            y: e.offset.y,
            scale: e.scale,
            opacity: e.opacity,
            rotation: e.rotation,
            kind: e.kind.code(),
            _pad: 0.0,
        })
    }

    pub fn drain_messages(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_is_announced() {
        let mut o = Overlays::new();
        o.create(EntityId(1), ElementKind::Sentence, "hello", None, 0);
        o.create(EntityId(2), ElementKind::Glyph, "h", Some(EntityId(1)), 0);
        o.set_text(EntityId(1), "bye");
        o.set_text(EntityId(9), "ignored");
        o.remove_kind(ElementKind::Glyph);
        assert!(!o.remove(EntityId(2)));
        let messages = o.drain_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[3], Message::ElementRemoved { id: EntityId(2) });
        assert_eq!(o.len(), 1);
        assert_eq!(o.get(EntityId(1)).map(|e| e.text.as_str()), Some("bye"));
    }

    #[test]
    fn instances_carry_kind_codes() {
        let mut o = Overlays::new();
        o.create(EntityId(4), ElementKind::Help, "?", None, 0);
        let inst: Vec<ElementInstance> = o.instances().collect();
        assert_eq!(inst[0].kind, ElementKind::Help.code());
        assert_eq!(inst[0].opacity, 0.0);
    }
}
