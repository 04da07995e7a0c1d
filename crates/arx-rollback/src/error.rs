use arx_diff::DiffError;
use arx_refs::RefError;
use arx_snapshot::{RepositoryError, SnapshotError};
use arx_store::StoreError;

/// Errors that end a rollback in the `Failed` state.
#[derive(Debug, thiserror::Error)]
pub enum RollbackError {
    /// The target named neither a ref nor a stored object.
    #[error("version not found: {target}")]
    VersionNotFound { target: String },

    /// The target snapshot records a different building.
    #[error("snapshot belongs to building {found}, not {expected}")]
    BuildingMismatch { expected: String, found: String },

    /// Post-restore integrity check failed. No version was recorded.
    #[error("validation failed: {}", errors.join("; "))]
    ValidationFailed { errors: Vec<String> },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ref error: {0}")]
    Refs(#[from] RefError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("live repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Convenience alias for rollback operations.
pub type Result<T> = std::result::Result<T, RollbackError>;
