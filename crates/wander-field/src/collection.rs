use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wander_engine::KeyValueStore;

use crate::error::FieldError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedEntry {
    pub used_keywords: Vec<String>,
}

/// Persisted `projectId -> { usedKeywords }` mapping.
///
/// A project enters the mapping once; later attempts leave the stored entry
/// untouched. Store failures never propagate past this type's callers: load
/// falls back to an empty state and writes are best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionState {
    entries: BTreeMap<String, CollectedEntry>,
}

impl CollectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the state stored under `key`.
    pub fn read(store: &dyn KeyValueStore, key: &str) -> Result<Self, FieldError> {
        match store.get(key)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Self::new()),
        }
    }

    /// Read the state, falling back to empty on any failure.
    pub fn load(store: &dyn KeyValueStore, key: &str) -> Self {
        Self::read(store, key).unwrap_or_else(|err| {
            log::warn!("starting with an empty collection: {}", err);
            Self::new()
        })
    }

    pub fn write(&self, store: &mut dyn KeyValueStore, key: &str) -> Result<(), FieldError> {
        let json = serde_json::to_string(self)?;
        store.set(key, &json)?;
        Ok(())
    }

    /// Best-effort write.
    pub fn persist(&self, store: &mut dyn KeyValueStore, key: &str) {
        if let Err(err) = self.write(store, key) {
            log::warn!("collection not saved: {}", err);
        }
    }

    /// Record `id` as collected with the keywords used. Returns `false`, and
    /// changes nothing, when the project was already collected.
    pub fn collect(&mut self, id: &str, used_keywords: &[String]) -> bool {
        if self.entries.contains_key(id) {
            return false;
        }
        self.entries.insert(
            id.to_string(),
            CollectedEntry { used_keywords: used_keywords.to_vec() },
        );
        true
    }

    /// Forget everything, including the stored copy.
    pub fn reset(&mut self, store: &mut dyn KeyValueStore, key: &str) {
        self.entries.clear();
        if let Err(err) = store.remove(key) {
            log::warn!("collection not cleared from store: {}", err);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn used_keywords(&self, id: &str) -> Option<&[String]> {
        self.entries.get(id).map(|e| e.used_keywords.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wander_engine::MemoryStore;

    const KEY: &str = "collectedProjects";

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn round_trips_through_the_store_format() {
        let mut store = MemoryStore::new();
        let mut state = CollectionState::new();
        assert!(state.collect("mobius", &words(&["loop", "time", "edge"])));
        state.persist(&mut store, KEY);

        let raw = store.get(KEY).unwrap().unwrap();
        assert_eq!(raw, r#"{"mobius":{"usedKeywords":["loop","time","edge"]}}"#);
        assert_eq!(CollectionState::load(&store, KEY), state);
    }

    #[test]
    fn collect_is_idempotent() {
        let mut state = CollectionState::new();
        assert!(state.collect("a", &words(&["x", "y", "z"])));
        assert!(!state.collect("a", &words(&["q"])));
        assert_eq!(state.used_keywords("a").unwrap(), &words(&["x", "y", "z"])[..]);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn corrupt_or_missing_state_loads_empty() {
        let store = MemoryStore::new().with_entry(KEY, "{broken");
        assert!(matches!(CollectionState::read(&store, KEY), Err(FieldError::Corrupt(_))));
        assert!(CollectionState::load(&store, KEY).is_empty());
        assert!(CollectionState::load(&MemoryStore::new(), KEY).is_empty());
    }

    #[test]
    fn write_failure_is_not_fatal() {
        let mut store = MemoryStore::failing();
        let mut state = CollectionState::new();
        state.collect("a", &words(&["x"]));
        assert!(state.write(&mut store, KEY).is_err());
        state.persist(&mut store, KEY);
        assert!(state.contains("a"));
        state.reset(&mut store, KEY);
        assert!(state.is_empty());
    }
}
