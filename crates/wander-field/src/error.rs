use thiserror::Error;
use wander_engine::StoreError;

/// Failures the field recovers from. None of them ever leaves the frame tick:
/// each is logged where it happens and the field carries on with a fallback.
#[derive(Debug, Error)]
pub enum FieldError {
    /// A project payload could not be fetched or parsed; the project is excluded.
    #[error("project '{id}' failed to load: {reason}")]
    DataLoad { id: String, reason: String },

    /// The collection store could not be read or written.
    #[error("collection store: {0}")]
    Persistence(#[from] StoreError),

    /// Persisted collection state was not valid JSON.
    #[error("collection state is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// A configuration override was unreadable or out of range.
    #[error("invalid field config: {0}")]
    Config(String),

    /// A sequence was asked to start without its prerequisites.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A presentation hook the sequence relies on returned nothing usable.
    #[error("missing presentation element: {0}")]
    MissingInterface(&'static str),
}
