use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not an arx repository (or missing {0})")]
    NotInitialized(PathBuf),

    #[error("repository already initialized at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown remote: {0}")]
    UnknownRemote(String),

    #[error("not a commit: {0}")]
    NotACommit(String),

    #[error("store error: {0}")]
    Store(#[from] arx_store::StoreError),

    #[error("ref error: {0}")]
    Refs(#[from] arx_refs::RefError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] arx_snapshot::SnapshotError),

    #[error("diff error: {0}")]
    Diff(#[from] arx_diff::DiffError),

    #[error("rollback error: {0}")]
    Rollback(#[from] arx_rollback::RollbackError),

    #[error("sync error: {0}")]
    Sync(#[from] arx_sync::SyncError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
