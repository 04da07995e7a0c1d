//! Object graph traversal.
//!
//! Edges: commit -> parents + tree, snapshot -> four category subtrees,
//! tree -> entries. Blobs and tags are leaves.

use std::collections::{HashSet, VecDeque};

use arx_types::ObjectId;

use crate::error::StoreResult;
use crate::object::{CommitObject, Object, ObjectKind, SnapshotObject, Tree};
use crate::traits::ObjectStore;

/// Direct children of an object.
pub fn references(object: &Object) -> StoreResult<Vec<ObjectId>> {
    let children = match object.kind {
        ObjectKind::Commit => {
            let commit = CommitObject::from_object(object)?;
            let mut ids = commit.parents;
            ids.push(commit.tree);
            ids
        }
        ObjectKind::Snapshot => SnapshotObject::from_object(object)?
            .subtrees()
            .iter()
            .map(|(_, id)| *id)
            .collect(),
        ObjectKind::Tree => Tree::from_object(object)?
            .entries
            .into_iter()
            .map(|e| e.id)
            .collect(),
        ObjectKind::Blob | ObjectKind::Tag => Vec::new(),
    };
    Ok(children.into_iter().filter(|id| !id.is_null()).collect())
}

/// Breadth-first walk from `roots`, returning every reachable id.
///
/// Ids in `exclude` are neither returned nor expanded, which lets a push skip
/// history the remote already has. A reachable id that is missing from the
/// store is an error.
pub fn reachable(
    store: &dyn ObjectStore,
    roots: impl IntoIterator<Item = ObjectId>,
    exclude: &HashSet<ObjectId>,
) -> StoreResult<HashSet<ObjectId>> {
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut queue: VecDeque<ObjectId> = roots
        .into_iter()
        .filter(|id| !id.is_null() && !exclude.contains(id))
        .collect();

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        let object = store.read(&id)?;
        for child in references(&object)? {
            if !seen.contains(&child) && !exclude.contains(&child) {
                queue.push_back(child);
            }
        }
    }
    Ok(seen)
}
