//! Error types for the diff crate.
//!
//! Only resolving the two snapshot roots can fail a diff. Problems below the
//! roots are logged and the affected entries skipped.

use arx_snapshot::SnapshotError;
use arx_store::StoreError;
use arx_types::ObjectId;

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A snapshot root could not be loaded.
    #[error("cannot load snapshot root {id}: {source}")]
    Root {
        id: ObjectId,
        #[source]
        source: SnapshotError,
    },

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for diff operations.
pub type Result<T> = std::result::Result<T, DiffError>;
