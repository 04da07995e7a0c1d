//! Error types for snapshot construction and loading.

use arx_store::StoreError;
use arx_types::ObjectId;
use thiserror::Error;

/// Failure reported by a live-state repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    Duplicate { entity: &'static str, id: String },

    /// Any other backend failure.
    #[error("repository backend error: {0}")]
    Backend(String),
}

/// Result alias for live-state repository calls.
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Errors from building or reading snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The object cannot serve as a snapshot root.
    #[error("object {id} is a {kind}, not a snapshot, commit or tree")]
    NotASnapshot { id: ObjectId, kind: String },

    /// An entity blob did not decode into its record type.
    #[error("entity {entity} in {id} failed to decode: {reason}")]
    Entity {
        entity: &'static str,
        id: ObjectId,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Serialization(e.to_string())
    }
}

/// Result alias for snapshot operations.
pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;
