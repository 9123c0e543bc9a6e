use serde::{Deserialize, Serialize};

use crate::error::FieldError;

/// Case- and whitespace-insensitive key used to compare keywords.
pub fn normalize_word(value: &str) -> String {
    value.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub label: String,
}

/// One project document as delivered by the host. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub year: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    pub keywords: Vec<String>,
    pub full_sentence: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl ProjectRecord {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether the project lists `word` (compared normalized).
    pub fn has_keyword(&self, word: &str) -> bool {
        let key = normalize_word(word);
        self.keywords.iter().any(|k| normalize_word(k) == key)
    }
}

/// Projects in canonical (configured) order, filled in as payloads arrive.
///
/// Every configured id reports exactly once, either with a record or as a
/// failure; failed ids are excluded and never block the others.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    slots: Vec<(String, Slot)>,
}

#[derive(Debug, Clone)]
enum Slot {
    Waiting,
    Loaded(ProjectRecord),
    Failed,
}

impl Catalog {
    pub fn new(ids: &[String]) -> Self {
        Self {
            slots: ids.iter().map(|id| (id.clone(), Slot::Waiting)).collect(),
        }
    }

    /// Build a fully loaded catalog directly from records.
    pub fn from_records(records: Vec<ProjectRecord>) -> Self {
        Self {
            slots: records.into_iter().map(|r| (r.id.clone(), Slot::Loaded(r))).collect(),
        }
    }

    /// Whether `id` is a configured project still waiting for its payload.
    pub fn is_waiting(&self, id: &str) -> bool {
        self.slots.iter().any(|(key, slot)| key == id && matches!(slot, Slot::Waiting))
    }

    /// Accept the host's answer for `id`. Returns the load error when the
    /// project is excluded; unknown or already-reported ids are ignored.
    pub fn deliver(&mut self, id: &str, body: Result<&str, &str>) -> Result<(), FieldError> {
        let Some((_, slot)) = self.slots.iter_mut().find(|(key, _)| key == id) else {
            return Ok(());
        };
        if !matches!(slot, Slot::Waiting) {
            return Ok(());
        }
        let parsed = body
            .map_err(str::to_string)
            .and_then(|json| ProjectRecord::from_json(json).map_err(|e| e.to_string()));
        match parsed {
            Ok(record) => {
                *slot = Slot::Loaded(record);
                Ok(())
            }
            Err(reason) => {
                *slot = Slot::Failed;
                Err(FieldError::DataLoad { id: id.to_string(), reason })
            }
        }
    }

    /// True once every configured id has reported.
    pub fn is_complete(&self) -> bool {
        !self.slots.iter().any(|(_, slot)| matches!(slot, Slot::Waiting))
    }

    /// Loaded projects in canonical order.
    pub fn projects(&self) -> impl Iterator<Item = &ProjectRecord> {
        self.slots.iter().filter_map(|(_, slot)| match slot {
            Slot::Loaded(record) => Some(record),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.projects().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<&ProjectRecord> {
        self.projects().find(|p| p.id == id)
    }

    /// Distinct keywords of all loaded projects, first-seen order.
    pub fn vocabulary(&self) -> Vec<String> {
        let mut words: Vec<String> = Vec::new();
        for project in self.projects() {
            for word in &project.keywords {
                let key = normalize_word(word);
                if key.is_empty() || words.iter().any(|w| normalize_word(w) == key) {
                    continue;
                }
                words.push(word.trim().to_string());
            }
        }
        words
    }
}

#[cfg(test)]
pub(crate) fn record(id: &str, keywords: &[&str]) -> ProjectRecord {
    ProjectRecord {
        id: id.to_string(),
        name: format!("Project {}", id),
        year: "2024".to_string(),
        kind: "installation".to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        full_sentence: format!("{} is a sentence", id),
        description: String::new(),
        content: String::new(),
        image: String::new(),
        links: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent_and_insensitive() {
        for s in [" Mirror ", "mirror", "MIRROR\n", "\tMiRrOr", "two words ", ""] {
            let once = normalize_word(s);
            assert_eq!(normalize_word(&once), once);
        }
        assert_eq!(normalize_word(" Mirror "), normalize_word("mirror"));
    }

    #[test]
    fn parses_project_document() {
        let json = r#"{
            "id": "mobius", "name": "Mobius", "year": "2023", "type": "film",
            "keywords": ["loop", "Time"], "fullSentence": "A strip with one side.",
            "description": "d", "content": "<p>c</p>", "image": "cover.jpg",
            "links": [{"url": "https://example.org", "label": "site"}]
        }"#;
        let p = ProjectRecord::from_json(json).unwrap();
        assert_eq!(p.kind, "film");
        assert_eq!(p.links[0].label, "site");
        assert!(p.has_keyword(" time "));
    }

    #[test]
    fn failed_payload_is_excluded_without_blocking() {
        let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let mut catalog = Catalog::new(&ids);
        let a = serde_json::to_string(&record("a", &["x", "y"])).unwrap();
        let c = serde_json::to_string(&record("c", &["y", "z"])).unwrap();

        assert!(catalog.deliver("a", Ok(&a)).is_ok());
        assert!(!catalog.is_complete());
        assert!(matches!(catalog.deliver("b", Err("404")), Err(FieldError::DataLoad { .. })));
        assert!(catalog.deliver("c", Ok(&c)).is_ok());

        assert!(catalog.is_complete());
        let ids: Vec<&str> = catalog.projects().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(catalog.vocabulary(), vec!["x", "y", "z"]);
    }

    #[test]
    fn invalid_json_counts_as_failure() {
        let mut catalog = Catalog::new(&["a".to_string()]);
        assert!(catalog.deliver("a", Ok("{oops")).is_err());
        assert!(catalog.is_complete());
        assert!(catalog.is_empty());
    }

    #[test]
    fn unknown_and_repeated_ids_are_ignored() {
        let mut catalog = Catalog::new(&["a".to_string()]);
        let a = serde_json::to_string(&record("a", &["x"])).unwrap();
        assert!(catalog.deliver("zzz", Ok(&a)).is_ok());
        assert!(catalog.deliver("a", Ok(&a)).is_ok());
        assert!(catalog.deliver("a", Err("late")).is_ok());
        assert_eq!(catalog.len(), 1);
    }
}
