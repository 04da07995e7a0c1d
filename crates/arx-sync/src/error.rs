use arx_refs::RefError;
use arx_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote answered with a non-success status.
    #[error("remote returned {status}: {message}")]
    RemoteProtocol { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response body did not decode.
    #[error("decode error: {0}")]
    Decode(String),

    /// The remote refused a ref update.
    #[error("ref rejected: {name}: {reason}")]
    RefRejected { name: String, reason: String },

    /// Pull never merges; diverged refs are overwritten or the caller is told.
    #[error("merging is not supported; {name} would need a merge")]
    MergeUnsupported { name: String },

    #[error("invalid remote configuration: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ref error: {0}")]
    Refs(#[from] RefError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SyncError::Decode(e.to_string())
        } else {
            SyncError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Decode(e.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
