//! Mark-and-sweep garbage collection.
//!
//! Marks everything reachable from the supplied roots (normally every ref
//! value and every reflog value) and deletes the rest.

use std::collections::HashSet;

use arx_types::ObjectId;
use tracing::{debug, info};

use crate::error::StoreResult;
use crate::traits::ObjectStore;
use crate::walk::reachable;

/// Outcome of a collection pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Objects present when the sweep started.
    pub scanned: usize,
    /// Objects reachable from the roots.
    pub reachable: usize,
    /// Ids that were (or, in a dry run, would be) removed.
    pub removed: Vec<ObjectId>,
    pub dry_run: bool,
}

/// Delete every object not reachable from `roots`.
///
/// Roots that no longer exist in the store are ignored. With `dry_run`
/// nothing is deleted and `removed` lists the candidates.
pub fn collect_garbage(
    store: &dyn ObjectStore,
    roots: impl IntoIterator<Item = ObjectId>,
    dry_run: bool,
) -> StoreResult<GcReport> {
    let mut live_roots = Vec::new();
    for root in roots {
        if !root.is_null() && store.exists(&root)? {
            live_roots.push(root);
        }
    }
    let marked = reachable(store, live_roots, &HashSet::new())?;

    let mut report = GcReport {
        reachable: marked.len(),
        dry_run,
        ..GcReport::default()
    };
    let all: Vec<ObjectId> = store.list()?.collect::<StoreResult<_>>()?;
    report.scanned = all.len();

    for id in all {
        if marked.contains(&id) {
            continue;
        }
        if !dry_run {
            store.delete(&id)?;
        }
        debug!(%id, dry_run, "unreachable object");
        report.removed.push(id);
    }
    report.removed.sort();

    info!(
        scanned = report.scanned,
        reachable = report.reachable,
        removed = report.removed.len(),
        dry_run,
        "garbage collection finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryObjectStore;
    use crate::object::TreeEntry;

    #[test]
    fn sweeps_unreachable_objects() {
        let store = InMemoryObjectStore::new();
        let kept_blob = store.create_blob(b"kept").unwrap();
        let root = store.create_tree(vec![TreeEntry::blob("k", kept_blob)]).unwrap();
        let orphan = store.create_blob(b"orphan").unwrap();

        let report = collect_garbage(&store, [root], false).unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.reachable, 2);
        assert_eq!(report.removed, vec![orphan]);
        assert!(!store.exists(&orphan).unwrap());
        assert!(store.exists(&kept_blob).unwrap());
    }

    #[test]
    fn dry_run_deletes_nothing() {
        let store = InMemoryObjectStore::new();
        let orphan = store.create_blob(b"orphan").unwrap();
        let report = collect_garbage(&store, Vec::new(), true).unwrap();
        assert_eq!(report.removed, vec![orphan]);
        assert!(store.exists(&orphan).unwrap());
    }

    #[test]
    fn missing_roots_are_ignored() {
        let store = InMemoryObjectStore::new();
        store.create_blob(b"x").unwrap();
        let report = collect_garbage(&store, [ObjectId::from_bytes(b"gone")], false).unwrap();
        assert_eq!(report.removed.len(), 1);
    }
}
