pub mod store;

pub use store::{KeyValueStore, MemoryStore, StoreError};
