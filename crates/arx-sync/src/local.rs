use std::sync::Arc;

use arx_store::Object;
use arx_types::ObjectId;
use async_trait::async_trait;

use crate::error::SyncResult;
use crate::host::RepositoryHost;
use crate::transport::RemoteTransport;
use crate::types::{RefUpdate, RefUpdateResult, RemoteRef, RepoInfo};

/// A remote living in the same process, e.g. a second repository on disk.
#[derive(Clone, Debug)]
pub struct LocalTransport {
    host: Arc<RepositoryHost>,
}

impl LocalTransport {
    pub fn new(host: Arc<RepositoryHost>) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &RepositoryHost {
        &self.host
    }
}

#[async_trait]
impl RemoteTransport for LocalTransport {
    async fn list_refs(&self) -> SyncResult<Vec<RemoteRef>> {
        self.host.list_refs()
    }

    async fn fetch_objects(&self, ids: &[ObjectId]) -> SyncResult<Vec<Object>> {
        self.host.fetch(ids)
    }

    async fn push_objects(&self, objects: &[Object]) -> SyncResult<usize> {
        self.host.store(objects)
    }

    async fn update_refs(&self, updates: &[RefUpdate]) -> SyncResult<Vec<RefUpdateResult>> {
        self.host.update_refs(updates)
    }

    async fn info(&self) -> SyncResult<RepoInfo> {
        Ok(self.host.info())
    }
}
