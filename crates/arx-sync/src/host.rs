//! The serving side of the sync protocol, independent of how requests
//! arrive. Both the HTTP router and [`LocalTransport`](crate::LocalTransport)
//! delegate here.

use std::sync::{Arc, RwLock};

use arx_refs::{validate_ref_path, RefError, RefStore, RefValue, HEAD, HEADS, TAGS};
use arx_store::{Object, ObjectStore};
use arx_types::ObjectId;
use tracing::{debug, info, warn};

use crate::error::SyncResult;
use crate::types::{RefUpdate, RefUpdateResult, RemoteRef, RepoInfo};

/// A repository exposed to remote peers.
pub struct RepositoryHost {
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    info: RwLock<RepoInfo>,
}

impl RepositoryHost {
    pub fn new(objects: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>, info: RepoInfo) -> Self {
        Self {
            objects,
            refs,
            info: RwLock::new(info),
        }
    }

    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    pub fn refs(&self) -> &dyn RefStore {
        self.refs.as_ref()
    }

    /// `HEAD` (when set) followed by every stored ref.
    pub fn list_refs(&self) -> SyncResult<Vec<RemoteRef>> {
        let mut out = Vec::new();
        if let Some(head) = self.refs.read(HEAD)? {
            out.push(RemoteRef::new(HEAD, &head));
        }
        for (name, value) in self.refs.list("")? {
            out.push(RemoteRef::new(name, &value));
        }
        Ok(out)
    }

    /// Stored objects among `ids`; unknown ids are skipped.
    pub fn fetch(&self, ids: &[ObjectId]) -> SyncResult<Vec<Object>> {
        let objects: Vec<Object> = self
            .objects
            .read_batch(ids)?
            .into_iter()
            .flatten()
            .collect();
        debug!(requested = ids.len(), found = objects.len(), "served objects");
        Ok(objects)
    }

    /// Verify and store received objects.
    pub fn store(&self, objects: &[Object]) -> SyncResult<usize> {
        let ids = self.objects.write_batch(objects)?;
        debug!(count = ids.len(), "received objects");
        Ok(ids.len())
    }

    /// Apply ref updates one by one. Each is a compare-and-swap against the
    /// sender's `old`; a stale `old`, a missing object or a ref outside
    /// `refs/heads/` and `refs/tags/` is rejected without affecting the others.
    pub fn update_refs(&self, updates: &[RefUpdate]) -> SyncResult<Vec<RefUpdateResult>> {
        let mut results = Vec::with_capacity(updates.len());
        let mut changed = false;
        for update in updates {
            let result = self.update_one(update)?;
            if result.accepted {
                changed = true;
            } else {
                warn!(name = %update.name, reason = ?result.reason, "rejected ref update");
            }
            results.push(result);
        }
        if changed {
            self.info.write().expect("lock poisoned").updated = self.refs.clock().now();
        }
        Ok(results)
    }

    fn update_one(&self, update: &RefUpdate) -> SyncResult<RefUpdateResult> {
        let name = update.name.as_str();
        if let Err(e) = validate_ref_path(name) {
            return Ok(RefUpdateResult::rejected(name, e.to_string()));
        }
        if !name.starts_with(HEADS) && !name.starts_with(TAGS) {
            return Ok(RefUpdateResult::rejected(
                name,
                "only branches and tags can be pushed",
            ));
        }
        if !self.objects.exists(&update.new)? {
            return Ok(RefUpdateResult::rejected(
                name,
                format!("object {} is not present", update.new),
            ));
        }
        let expected = update.old.map(RefValue::Direct);
        match self.refs.compare_and_swap(
            name,
            expected.as_ref(),
            &RefValue::Direct(update.new),
            "push",
        ) {
            Ok(()) => {
                info!(name, new = %update.new, "ref updated by push");
                Ok(RefUpdateResult::accepted(name))
            }
            Err(RefError::Conflict { actual, .. }) => Ok(RefUpdateResult::rejected(
                name,
                format!("stale update: remote has {actual}"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub fn info(&self) -> RepoInfo {
        self.info.read().expect("lock poisoned").clone()
    }
}

impl std::fmt::Debug for RepositoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHost")
            .field("name", &self.info().name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arx_refs::InMemoryRefStore;
    use arx_store::InMemoryObjectStore;
    use arx_types::FixedClock;
    use chrono::DateTime;

    fn host() -> RepositoryHost {
        let clock = Arc::new(FixedClock::default());
        let refs = InMemoryRefStore::with_clock(clock.clone());
        refs.init("main").unwrap();
        RepositoryHost::new(
            Arc::new(InMemoryObjectStore::with_clock(clock)),
            Arc::new(refs),
            RepoInfo {
                name: "hq".into(),
                description: String::new(),
                version: "1".into(),
                updated: DateTime::default(),
            },
        )
    }

    #[test]
    fn lists_head_first() {
        let host = host();
        let blob = host.objects().create_blob(b"x").unwrap();
        host.refs()
            .update("refs/heads/main", RefValue::Direct(blob), "seed")
            .unwrap();
        let refs = host.list_refs().unwrap();
        assert_eq!(refs[0].name, "HEAD");
        assert_eq!(refs[0].target, "refs/heads/main");
        assert_eq!(refs[1].name, "refs/heads/main");
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn fetch_skips_unknown_ids() {
        let host = host();
        let a = host.objects().create_blob(b"a").unwrap();
        let ghost = ObjectId::from_bytes(b"ghost");
        let got = host.fetch(&[a, ghost]).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, a);
    }

    #[test]
    fn update_requires_object_and_fresh_old_value() {
        let host = host();
        let a = host.objects().create_blob(b"a").unwrap();
        let b = host.objects().create_blob(b"b").unwrap();
        let ghost = ObjectId::from_bytes(b"ghost");

        let results = host
            .update_refs(&[
                RefUpdate {
                    name: "refs/heads/main".into(),
                    old: None,
                    new: a,
                },
                RefUpdate {
                    name: "refs/heads/ghost".into(),
                    old: None,
                    new: ghost,
                },
                RefUpdate {
                    name: "refs/remotes/origin/main".into(),
                    old: None,
                    new: a,
                },
            ])
            .unwrap();
        assert!(results[0].accepted);
        assert!(!results[1].accepted);
        assert!(!results[2].accepted);

        // A sender that still believes main is unset loses.
        let stale = host
            .update_refs(&[RefUpdate {
                name: "refs/heads/main".into(),
                old: None,
                new: b,
            }])
            .unwrap();
        assert!(!stale[0].accepted);
        assert!(stale[0].reason.as_deref().unwrap().starts_with("stale update"));
        assert_eq!(host.refs().resolve("refs/heads/main").unwrap(), a);
        assert_eq!(host.info().updated.timestamp(), 1_704_067_200);
    }
}
