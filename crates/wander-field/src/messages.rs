//! JSON messages for the host UI (Rust → host).

use serde::Serialize;
use wander_engine::EntityId;

use crate::app::{FieldPhase, View};
use crate::overlay::ElementKind;
use crate::project::ProjectRecord;

/// Summary of one gallery card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub id: EntityId,
    pub project_id: String,
    pub name: String,
    pub image: String,
    pub collected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    /// Current (view, phase) pair.
    View { view: View, phase: FieldPhase },
    KeywordSpawned { id: EntityId, word: String, user_submitted: bool },
    KeywordRemoved { id: EntityId },
    /// Words of the active selection shown in the collected bar.
    CollectedBar { words: Vec<String>, visible: bool },
    ElementCreated { id: EntityId, kind: ElementKind, text: String, parent: Option<EntityId>, index: usize },
    ElementText { id: EntityId, text: String },
    ElementRemoved { id: EntityId },
    /// Lines from `from` to each of `to`; an empty `to` clears them.
    HintLines { from: Option<EntityId>, to: Vec<EntityId> },
    Detail { project: ProjectRecord, used_keywords: Vec<String>, previous_view: View },
    DetailClosed,
    Gallery { cards: Vec<CardInfo> },
    FindWords { words: Vec<String>, active: bool },
    Progress { collected: usize, total: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_camel_case_json() {
        let json = serde_json::to_string(&Message::KeywordSpawned {
            id: EntityId(3),
            word: "sea".into(),
            user_submitted: false,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"keywordSpawned","id":3,"word":"sea","userSubmitted":false}"#);

        let json = serde_json::to_string(&Message::View { view: View::ProjectDetail, phase: FieldPhase::Active }).unwrap();
        assert_eq!(json, r#"{"type":"view","view":"projectDetail","phase":"active"}"#);
    }
}
