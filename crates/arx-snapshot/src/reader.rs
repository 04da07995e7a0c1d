//! Snapshot loading.
//!
//! A snapshot root may be given as a snapshot object, as a commit (whose
//! tree is followed once), or as a plain tree with entries named after the
//! four categories. Missing categories read as empty.

use std::sync::OnceLock;

use arx_store::{
    CommitObject, ContentHasher, Metadata, Object, ObjectKind, ObjectStore, SnapshotMetadata,
    SnapshotObject, Tree, TreeEntry,
};
use arx_types::{Attachment, BasPoint, Building, Equipment, Floor, ObjectId, Room};
use serde::de::DeserializeOwned;

use crate::error::{SnapshotError, SnapshotResult};
use crate::layout::{BUILDING, FILES, FLOORS, ITEMS, OPERATIONS, ROOMS, SPACE};
use crate::state::BuildingState;

/// Id of the empty tree, whether or not it has been written.
pub fn empty_tree_id() -> ObjectId {
    static EMPTY: OnceLock<ObjectId> = OnceLock::new();
    *EMPTY.get_or_init(|| {
        let content = Tree::empty().to_content().unwrap_or_else(|_| b"{\"entries\":[]}".to_vec());
        ContentHasher::OBJECT.object_id(ObjectKind::Tree, &Metadata::new(), &content)
    })
}

/// The space tree split into its parts.
#[derive(Clone, Debug)]
pub struct SpaceParts {
    pub building: Option<TreeEntry>,
    pub floors: ObjectId,
    pub rooms: ObjectId,
}

/// Reads snapshot trees and decodes entity blobs.
pub struct SnapshotReader<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> SnapshotReader<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Load the snapshot rooted at `id` (snapshot, commit or plain tree).
    pub fn root(&self, id: &ObjectId) -> SnapshotResult<SnapshotObject> {
        let object = self.store.read(id)?;
        match object.kind {
            ObjectKind::Commit => {
                let commit = CommitObject::from_object(&object)?;
                let tree = self.store.read(&commit.tree)?;
                self.root_of(&tree)
            }
            _ => self.root_of(&object),
        }
    }

    fn root_of(&self, object: &Object) -> SnapshotResult<SnapshotObject> {
        match object.kind {
            ObjectKind::Snapshot => Ok(SnapshotObject::from_object(object)?),
            ObjectKind::Tree => {
                let tree = Tree::from_object(object)?;
                let pick = |name: &str| tree.get(name).map_or_else(empty_tree_id, |e| e.id);
                Ok(SnapshotObject {
                    building_id: String::new(),
                    space: pick(SPACE),
                    items: pick(ITEMS),
                    files: pick(FILES),
                    operations: pick(OPERATIONS),
                    metadata: SnapshotMetadata::default(),
                })
            }
            other => Err(SnapshotError::NotASnapshot {
                id: object.id,
                kind: other.to_string(),
            }),
        }
    }

    /// Read a tree; the null id and an unwritten empty tree read as empty.
    pub fn tree(&self, id: &ObjectId) -> SnapshotResult<Tree> {
        if id.is_null() {
            return Ok(Tree::empty());
        }
        match self.store.read_tree(id) {
            Ok(tree) => Ok(tree),
            Err(e) if e.is_not_found() && *id == empty_tree_id() => Ok(Tree::empty()),
            Err(e) => Err(e.into()),
        }
    }

    /// Split a space tree into the building entry and the floor/room trees.
    pub fn space_parts(&self, space: &ObjectId) -> SnapshotResult<SpaceParts> {
        let tree = self.tree(space)?;
        let id_of = |name: &str| tree.get(name).map_or_else(empty_tree_id, |e| e.id);
        Ok(SpaceParts {
            building: tree.get(BUILDING).cloned(),
            floors: id_of(FLOORS),
            rooms: id_of(ROOMS),
        })
    }

    /// Decode an entity blob.
    pub fn entity<T: DeserializeOwned>(&self, entity: &'static str, id: &ObjectId) -> SnapshotResult<T> {
        let object = self.store.read(id)?;
        serde_json::from_slice(&object.content).map_err(|e| SnapshotError::Entity {
            entity,
            id: *id,
            reason: e.to_string(),
        })
    }

    fn entities<T: DeserializeOwned>(&self, entity: &'static str, tree: &ObjectId) -> SnapshotResult<Vec<T>> {
        self.tree(tree)?
            .entries
            .iter()
            .map(|e| self.entity(entity, &e.id))
            .collect()
    }

    /// Equipment blob entries across all type subtrees, as `(type, entry)`.
    pub fn equipment_entries(&self, items: &ObjectId) -> SnapshotResult<Vec<(String, TreeEntry)>> {
        let mut out = Vec::new();
        for bucket in self.tree(items)?.entries {
            for entry in self.tree(&bucket.id)?.entries {
                out.push((bucket.name.clone(), entry));
            }
        }
        Ok(out)
    }

    /// Decode every entity under the snapshot rooted at `id`.
    pub fn state(&self, id: &ObjectId) -> SnapshotResult<BuildingState> {
        let root = self.root(id)?;
        let space = self.space_parts(&root.space)?;
        let building: Option<Building> = match &space.building {
            Some(entry) => Some(self.entity("building", &entry.id)?),
            None => None,
        };
        let mut equipment: Vec<Equipment> = Vec::new();
        for (_, entry) in self.equipment_entries(&root.items)? {
            equipment.push(self.entity("equipment", &entry.id)?);
        }
        let mut state = BuildingState {
            building,
            floors: self.entities::<Floor>("floor", &space.floors)?,
            rooms: self.entities::<Room>("room", &space.rooms)?,
            equipment,
            points: self.entities::<BasPoint>("point", &root.operations)?,
            attachments: self.entities::<Attachment>("attachment", &root.files)?,
        };
        state.sort();
        Ok(state)
    }

    /// Entity counts computed from tree entries alone, without decoding blobs.
    pub fn counts(&self, id: &ObjectId) -> SnapshotResult<SnapshotMetadata> {
        let root = self.root(id)?;
        let space = self.space_parts(&root.space)?;
        Ok(SnapshotMetadata {
            floor_count: self.tree(&space.floors)?.len() as u64,
            room_count: self.tree(&space.rooms)?.len() as u64,
            equipment_count: self.equipment_entries(&root.items)?.len() as u64,
            file_count: self.tree(&root.files)?.len() as u64,
            point_count: self.tree(&root.operations)?.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arx_store::InMemoryObjectStore;
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[test]
    fn empty_tree_id_matches_written_empty_tree() {
        let store = InMemoryObjectStore::new();
        assert_eq!(store.create_tree(vec![]).unwrap(), empty_tree_id());
    }

    #[test]
    fn plain_empty_tree_reads_as_empty_snapshot() {
        let store = InMemoryObjectStore::new();
        let root = store.create_tree(vec![]).unwrap();
        let reader = SnapshotReader::new(&store);
        let snap = reader.root(&root).unwrap();
        assert_eq!(snap.space, empty_tree_id());
        assert_eq!(reader.counts(&root).unwrap(), SnapshotMetadata::default());
        assert_eq!(reader.state(&root).unwrap(), BuildingState::default());
    }

    #[test]
    fn commit_root_is_followed() {
        let store = InMemoryObjectStore::new();
        let tree = store.create_tree(vec![]).unwrap();
        let commit = CommitObject {
            parents: vec![],
            author: "a".into(),
            email: "a@example.com".into(),
            message: "root".into(),
            timestamp: Utc::now(),
            tree,
            changes: BTreeMap::new(),
        };
        let id = store
            .write(ObjectKind::Commit, &commit.to_content().unwrap(), &Metadata::new())
            .unwrap();
        assert!(SnapshotReader::new(&store).root(&id).is_ok());
    }

    #[test]
    fn blob_is_not_a_snapshot() {
        let store = InMemoryObjectStore::new();
        let blob = store.create_blob(b"{}").unwrap();
        assert!(matches!(
            SnapshotReader::new(&store).root(&blob),
            Err(SnapshotError::NotASnapshot { .. })
        ));
    }

    #[test]
    fn bad_entity_blob_is_reported() {
        let store = InMemoryObjectStore::new();
        let blob = store.create_blob(b"not json").unwrap();
        let err = SnapshotReader::new(&store).entity::<Floor>("floor", &blob).unwrap_err();
        assert!(matches!(err, SnapshotError::Entity { entity: "floor", .. }));
    }
}
