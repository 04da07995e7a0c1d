//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// A reference with this name already exists.
    #[error("ref already exists: {name}")]
    AlreadyExists { name: String },

    /// Symbolic resolution did not reach an object id within the hop limit.
    #[error("too many levels of symbolic refs resolving {name} (limit {limit})")]
    TooManySymbolicLevels { name: String, limit: usize },

    /// HEAD is in a detached state (not pointing to a branch).
    #[error("HEAD is detached")]
    DetachedHead,

    /// The ref, branch, tag or remote name is invalid.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A target is neither a known ref nor a well-formed object id.
    #[error("invalid target: {target}")]
    InvalidTarget { target: String },

    /// A stored ref value could not be parsed.
    #[error("corrupt ref {name}: {value:?}")]
    CorruptRef { name: String, value: String },

    /// Compare-and-swap lost: the ref no longer holds the expected value.
    #[error("ref {name} changed concurrently: expected {expected}, found {actual}")]
    Conflict {
        name: String,
        expected: String,
        actual: String,
    },

    /// Cannot delete the currently checked-out branch.
    #[error("cannot delete current branch: {name}")]
    DeleteCurrentBranch { name: String },

    /// The branch policy forbids deletion.
    #[error("branch is protected: {name}")]
    ProtectedBranch { name: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for RefError {
    fn from(e: serde_json::Error) -> Self {
        RefError::Serialization(e.to_string())
    }
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
