use studybuddy_store::StoreError;
use thiserror::Error;

/// Structured error kinds surfaced at the core's boundary.
///
/// `Duplicate` and `InvalidInput` are expected, user-facing outcomes: a
/// declined operation with a reason, never a crash.  `Store` covers transient
/// persistence failures; during match derivation it means the whole
/// derivation aborted with no partial writes.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced user, profile, course or message does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness invariant (match triple, review pair) was violated.
    #[error("Already exists: {0}")]
    Duplicate(String),

    /// Malformed caller input (empty message, out-of-range rating,
    /// self-targeting operation).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transient persistence failure; the write is treated as not applied.
    #[error("Store unavailable: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => CoreError::NotFound("record".into()),
            StoreError::Duplicate => CoreError::Duplicate("record".into()),
            other => CoreError::Store(other),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
