//! Key-value persistence contract.
//!
//! Games persist small JSON documents through a `KeyValueStore`. The web
//! bridge backs it with `localStorage`; tests and headless runs use
//! `MemoryStore`.

use std::collections::HashMap;
use thiserror::Error;

/// Failures of the backing store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// The store is not reachable (e.g. storage disabled by the host).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Reading a key failed.
    #[error("failed to read '{key}': {reason}")]
    Read { key: String, reason: String },

    /// Writing or removing a key failed (quota, permissions).
    #[error("failed to write '{key}': {reason}")]
    Write { key: String, reason: String },
}

/// String key-value store.
pub trait KeyValueStore {
    /// `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store. Optionally fails every write, for exercising recovery paths.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `set` and `remove` always fail.
    pub fn failing() -> Self {
        Self {
            entries: HashMap::new(),
            fail_writes: true,
        }
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Write {
                key: key.to_string(),
                reason: "writes disabled".to_string(),
            });
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Write {
                key: key.to_string(),
                reason: "writes disabled".to_string(),
            });
        }
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn failing_store_reports_write_errors() {
        let mut store = MemoryStore::failing();
        let err = store.set("k", "v").unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert_eq!(err.to_string(), "failed to write 'k': writes disabled");
        assert!(store.remove("k").is_err());
    }
}
