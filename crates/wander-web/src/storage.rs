use wasm_bindgen::JsValue;
use wander_engine::{KeyValueStore, StoreError};

/// `window.localStorage` as a key-value store.
/// Every call re-resolves the storage object, so a store disabled mid-session
/// surfaces as `StoreError::Unavailable` instead of a stale handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        LocalStorage
    }

    fn storage() -> Result<web_sys::Storage, StoreError> {
        let window = web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".into()))?;
        window
            .local_storage()
            .map_err(|e| StoreError::Unavailable(describe(&e)))?
            .ok_or_else(|| StoreError::Unavailable("localStorage disabled".into()))
    }
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::storage()?.get_item(key).map_err(|e| StoreError::Read {
            key: key.to_string(),
            reason: describe(&e),
        })
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::storage()?.set_item(key, value).map_err(|e| StoreError::Write {
            key: key.to_string(),
            reason: describe(&e),
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        Self::storage()?.remove_item(key).map_err(|e| StoreError::Write {
            key: key.to_string(),
            reason: describe(&e),
        })
    }
}
