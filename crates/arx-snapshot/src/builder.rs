//! Snapshot construction.
//!
//! Every leaf entity becomes one JSON blob; blobs are grouped into the four
//! category trees, and the snapshot object ties the four tree ids together
//! with denormalized counts. Because ids are content hashes, a category whose
//! entities did not change produces the same tree id as last time.

use std::collections::BTreeMap;

use arx_store::{Metadata, ObjectKind, ObjectStore, SnapshotObject, TreeEntry};
use arx_types::ObjectId;
use serde::Serialize;
use tracing::debug;

use crate::error::SnapshotResult;
use crate::layout::{type_bucket, BUILDING, BUILDING_KEY, ENTITY_KEY, FLOORS, ROOMS};
use crate::repository::LiveRepositories;
use crate::state::BuildingState;

/// Writes building states into an object store as snapshot trees.
pub struct SnapshotBuilder<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Capture the live state of `building_id` and write it as a snapshot.
    pub fn capture(
        &self,
        live: &LiveRepositories,
        building_id: &str,
    ) -> SnapshotResult<(ObjectId, BuildingState)> {
        let state = BuildingState::capture(live, building_id)?;
        let id = self.write(building_id, &state)?;
        Ok((id, state))
    }

    /// Write `state` as a snapshot and return the snapshot object's id.
    pub fn write(&self, building_id: &str, state: &BuildingState) -> SnapshotResult<ObjectId> {
        let snapshot = SnapshotObject {
            building_id: building_id.to_string(),
            space: self.space_tree(state)?,
            items: self.items_tree(state)?,
            files: self.leaf_tree("attachment", state.attachments.iter().map(|a| (&a.id, a)))?,
            operations: self.leaf_tree("point", state.points.iter().map(|p| (&p.id, p)))?,
            metadata: state.metadata(),
        };
        let mut meta = Metadata::new();
        meta.insert(BUILDING_KEY.into(), building_id.to_string());
        let id = self
            .store
            .write(ObjectKind::Snapshot, &snapshot.to_content()?, &meta)?;
        debug!(
            %id,
            building_id,
            floors = snapshot.metadata.floor_count,
            equipment = snapshot.metadata.equipment_count,
            "snapshot written"
        );
        Ok(id)
    }

    /// Serialize one entity into a blob tagged with its entity kind.
    pub fn entity_blob<T: Serialize>(&self, entity: &str, value: &T) -> SnapshotResult<ObjectId> {
        let content = serde_json::to_vec(value)?;
        let mut meta = Metadata::new();
        meta.insert(ENTITY_KEY.into(), entity.to_string());
        Ok(self.store.write(ObjectKind::Blob, &content, &meta)?)
    }

    fn leaf_tree<'e, T, I>(&self, entity: &str, items: I) -> SnapshotResult<ObjectId>
    where
        T: Serialize + 'e,
        I: Iterator<Item = (&'e String, &'e T)>,
    {
        let mut entries = Vec::new();
        for (id, value) in items {
            entries.push(TreeEntry::blob(id.clone(), self.entity_blob(entity, value)?));
        }
        Ok(self.store.create_tree(entries)?)
    }

    fn space_tree(&self, state: &BuildingState) -> SnapshotResult<ObjectId> {
        let mut entries = Vec::with_capacity(3);
        if let Some(building) = &state.building {
            entries.push(TreeEntry::blob(BUILDING, self.entity_blob("building", building)?));
        }
        let floors = self.leaf_tree("floor", state.floors.iter().map(|f| (&f.id, f)))?;
        let rooms = self.leaf_tree("room", state.rooms.iter().map(|r| (&r.id, r)))?;
        entries.push(TreeEntry::tree(FLOORS, floors));
        entries.push(TreeEntry::tree(ROOMS, rooms));
        Ok(self.store.create_tree(entries)?)
    }

    fn items_tree(&self, state: &BuildingState) -> SnapshotResult<ObjectId> {
        let mut by_type: BTreeMap<&str, Vec<TreeEntry>> = BTreeMap::new();
        for equipment in &state.equipment {
            let blob = self.entity_blob("equipment", equipment)?;
            by_type
                .entry(type_bucket(&equipment.equipment_type))
                .or_default()
                .push(TreeEntry::blob(equipment.id.clone(), blob));
        }
        let mut entries = Vec::with_capacity(by_type.len());
        for (kind, children) in by_type {
            entries.push(TreeEntry::tree(kind, self.store.create_tree(children)?));
        }
        Ok(self.store.create_tree(entries)?)
    }
}
