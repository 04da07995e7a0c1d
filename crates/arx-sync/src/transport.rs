use arx_store::Object;
use arx_types::ObjectId;
use async_trait::async_trait;

use crate::error::SyncResult;
use crate::types::{RefUpdate, RefUpdateResult, RemoteRef, RepoInfo};

/// Transport interface for remote Arx repositories.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Every ref the remote advertises.
    async fn list_refs(&self) -> SyncResult<Vec<RemoteRef>>;
    /// Objects for `ids`. Ids the remote does not have are left out.
    async fn fetch_objects(&self, ids: &[ObjectId]) -> SyncResult<Vec<Object>>;
    /// Store objects on the remote. Each object's id is verified there.
    async fn push_objects(&self, objects: &[Object]) -> SyncResult<usize>;
    /// Move remote refs, each guarded by the value the sender last saw.
    async fn update_refs(&self, updates: &[RefUpdate]) -> SyncResult<Vec<RefUpdateResult>>;
    async fn info(&self) -> SyncResult<RepoInfo>;
}
