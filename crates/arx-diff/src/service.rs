//! The three-phase structural diff.
//!
//! 1. Compare the four category subtree ids of the two snapshots. Equal ids
//!    mean the category is untouched and it is skipped entirely.
//! 2. For each changed category, index both trees by entry name and classify
//!    every name as added, removed or modified. `space` and `items` are
//!    composite and are expanded one level (floors/rooms, type buckets).
//! 3. For modified leaves, decode both blobs and compare them field by field.
//!
//! Anything below the two roots that fails to load is logged and skipped, so
//! one damaged historical object yields a partial diff instead of an error.

use std::collections::BTreeMap;

use arx_snapshot::{SnapshotError, SnapshotReader, SpaceParts};
use arx_store::{CommitObject, ObjectKind, ObjectStore, SnapshotObject, Tree, TreeEntry};
use arx_types::{Location3, ObjectId};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::entries::{diff_entries, diff_maps, EntryChange};
use crate::error::{DiffError, Result};
use crate::fields::{diff_fields, FieldChange};
use crate::types::{
    BuildingDiff, ChangeCategory, ChangeType, DetailedChange, DiffResult, DiffSummary,
    EntityModification, EntityRef, EquipmentDiff, EquipmentMove, EquipmentRef, FilesDiff,
    OperationsDiff, Severity,
};

/// Computes [`DiffResult`]s between snapshots held in one object store.
///
/// Stateless apart from the store handle; safe to share across threads.
pub struct DiffService<'a> {
    store: &'a dyn ObjectStore,
}

#[derive(Default)]
struct LeafDiff {
    added: Vec<EntityRef>,
    removed: Vec<EntityRef>,
    modified: Vec<EntityModification>,
}

/// Flat change list and byte delta, filled while walking.
#[derive(Default)]
struct Collector {
    changes: Vec<DetailedChange>,
    size_delta: i64,
}

impl Collector {
    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        change_type: ChangeType,
        category: ChangeCategory,
        entity_type: &str,
        id: &str,
        name: &str,
        path: &str,
        description: String,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) {
        self.changes.push(DetailedChange {
            change_type,
            category,
            entity_type: entity_type.to_string(),
            entity_id: id.to_string(),
            entity_name: name.to_string(),
            path: path.to_string(),
            description,
            old_value,
            new_value,
            severity: Severity::classify(change_type, entity_type),
        });
    }
}

/// A decoded entity blob.
struct Doc {
    value: Value,
    size: u64,
}

impl Doc {
    fn name_or<'d>(&'d self, fallback: &'d str) -> &'d str {
        ["name", "point_name"]
            .iter()
            .find_map(|k| self.value.get(*k).and_then(Value::as_str))
            .unwrap_or(fallback)
    }

    fn location(&self) -> Option<Location3> {
        self.value
            .get("location")
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

fn split_fields(fields: &[FieldChange]) -> (Value, Value) {
    let mut old = Map::new();
    let mut new = Map::new();
    for f in fields {
        old.insert(f.field.clone(), f.old.clone());
        new.insert(f.field.clone(), f.new.clone());
    }
    (Value::Object(old), Value::Object(new))
}

type IdIndex<'e> = (BTreeMap<&'e str, &'e TreeEntry>, BTreeMap<&'e str, &'e str>);

/// `id -> entry` and `id -> bucket` maps over flattened equipment entries.
fn index_by_id(entries: &[(String, TreeEntry)]) -> IdIndex<'_> {
    let by_id = entries.iter().map(|(_, e)| (e.name.as_str(), e)).collect();
    let bucket = entries
        .iter()
        .map(|(b, e)| (e.name.as_str(), b.as_str()))
        .collect();
    (by_id, bucket)
}

fn field_list(fields: &[FieldChange]) -> String {
    fields
        .iter()
        .map(|f| f.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl<'a> DiffService<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Diff two snapshot roots. Each id may be a commit, a snapshot object,
    /// or a plain tree.
    pub fn diff(&self, from: &ObjectId, to: &ObjectId) -> Result<DiffResult> {
        let (from_snapshot, from_root) = self.root(from)?;
        let (to_snapshot, to_root) = self.root(to)?;

        let mut result = DiffResult {
            from: from.to_hex(),
            to: to.to_hex(),
            from_snapshot,
            to_snapshot,
            building: BuildingDiff::default(),
            equipment: EquipmentDiff::default(),
            files: FilesDiff::default(),
            operations: OperationsDiff::default(),
            summary: DiffSummary::default(),
            changes: Vec::new(),
        };

        // Phase 1.
        let summary = &mut result.summary;
        summary.space_changed = from_root.space != to_root.space;
        summary.items_changed = from_root.items != to_root.items;
        summary.files_changed = from_root.files != to_root.files;
        summary.operations_changed = from_root.operations != to_root.operations;
        debug!(
            from = %from_snapshot,
            to = %to_snapshot,
            space = summary.space_changed,
            items = summary.items_changed,
            files = summary.files_changed,
            operations = summary.operations_changed,
            "diff phase 1"
        );

        let mut out = Collector::default();

        // Phases 2 and 3, per changed category.
        if result.summary.space_changed {
            result.building = self.diff_space(&from_root, &to_root, &mut out);
        }
        if result.summary.items_changed {
            result.equipment = self.diff_equipment(&from_root.items, &to_root.items, &mut out);
        }
        if result.summary.files_changed {
            let leaves = self.diff_leaves(
                ChangeCategory::Files,
                "attachment",
                "files",
                &from_root.files,
                &to_root.files,
                &mut out,
            );
            result.files = FilesDiff {
                changed: true,
                added: leaves.added,
                removed: leaves.removed,
                modified: leaves.modified,
            };
        }
        if result.summary.operations_changed {
            let leaves = self.diff_leaves(
                ChangeCategory::Operations,
                "point",
                "operations",
                &from_root.operations,
                &to_root.operations,
                &mut out,
            );
            result.operations = OperationsDiff {
                changed: true,
                added: leaves.added,
                removed: leaves.removed,
                modified: leaves.modified,
            };
        }

        let s = &mut result.summary;
        let b = &result.building;
        s.building_modified = !b.building_fields.is_empty();
        s.floors_added = b.floors_added.len();
        s.floors_removed = b.floors_removed.len();
        s.floors_modified = b.floors_modified.len();
        s.rooms_added = b.rooms_added.len();
        s.rooms_removed = b.rooms_removed.len();
        s.rooms_modified = b.rooms_modified.len();
        let e = &result.equipment;
        s.equipment_added = e.added.len();
        s.equipment_removed = e.removed.len();
        s.equipment_modified = e.modified.len();
        s.equipment_moved = e.moved.len();
        s.files_added = result.files.added.len();
        s.files_removed = result.files.removed.len();
        s.files_modified = result.files.modified.len();
        s.points_added = result.operations.added.len();
        s.points_removed = result.operations.removed.len();
        s.points_modified = result.operations.modified.len();
        s.size_delta = out.size_delta;
        s.total_changes = s.compute_total();
        result.changes = out.changes;

        debug!(total = result.summary.total_changes, "diff complete");
        Ok(result)
    }

    /// Resolve `id` to its snapshot object id and decoded snapshot.
    fn root(&self, id: &ObjectId) -> Result<(ObjectId, SnapshotObject)> {
        let root_err = |source: SnapshotError| DiffError::Root { id: *id, source };
        let object = self.store.read(id)?;
        let snapshot_id = if object.kind == ObjectKind::Commit {
            CommitObject::from_object(&object)
                .map_err(|e| root_err(e.into()))?
                .tree
        } else {
            *id
        };
        let root = SnapshotReader::new(self.store)
            .root(&snapshot_id)
            .map_err(root_err)?;
        Ok((snapshot_id, root))
    }

    // -- loading (failures are logged and skipped) --------------------------

    fn tree(&self, id: &ObjectId) -> Option<Tree> {
        match SnapshotReader::new(self.store).tree(id) {
            Ok(tree) => Some(tree),
            Err(e) => {
                warn!(%id, error = %e, "skipping unreadable tree");
                None
            }
        }
    }

    fn doc(&self, entry: &TreeEntry) -> Option<Doc> {
        let object = match self.store.read(&entry.id) {
            Ok(object) => object,
            Err(e) => {
                warn!(name = %entry.name, id = %entry.id, error = %e, "skipping unreadable entity");
                return None;
            }
        };
        match serde_json::from_slice(&object.content) {
            Ok(value) => Some(Doc {
                value,
                size: object.size,
            }),
            Err(e) => {
                warn!(name = %entry.name, id = %entry.id, error = %e, "skipping undecodable entity");
                None
            }
        }
    }

    fn space_parts(&self, id: &ObjectId) -> Option<SpaceParts> {
        match SnapshotReader::new(self.store).space_parts(id) {
            Ok(parts) => Some(parts),
            Err(e) => {
                warn!(%id, error = %e, "skipping unreadable space tree");
                None
            }
        }
    }

    // -- space --------------------------------------------------------------

    fn diff_space(
        &self,
        from: &SnapshotObject,
        to: &SnapshotObject,
        out: &mut Collector,
    ) -> BuildingDiff {
        let mut diff = BuildingDiff {
            changed: true,
            ..BuildingDiff::default()
        };
        let (Some(old), Some(new)) = (self.space_parts(&from.space), self.space_parts(&to.space))
        else {
            return diff;
        };

        self.diff_building_record(old.building.as_ref(), new.building.as_ref(), &mut diff, out);

        if old.floors != new.floors {
            let leaves = self.diff_leaves(
                ChangeCategory::Space,
                "floor",
                "space/floors",
                &old.floors,
                &new.floors,
                out,
            );
            diff.floors_added = leaves.added;
            diff.floors_removed = leaves.removed;
            diff.floors_modified = leaves.modified;
        }
        if old.rooms != new.rooms {
            let leaves = self.diff_leaves(
                ChangeCategory::Space,
                "room",
                "space/rooms",
                &old.rooms,
                &new.rooms,
                out,
            );
            diff.rooms_added = leaves.added;
            diff.rooms_removed = leaves.removed;
            diff.rooms_modified = leaves.modified;
        }
        diff
    }

    fn diff_building_record(
        &self,
        old: Option<&TreeEntry>,
        new: Option<&TreeEntry>,
        diff: &mut BuildingDiff,
        out: &mut Collector,
    ) {
        const PATH: &str = "space/building";
        match (old, new) {
            (Some(o), Some(n)) if o.id != n.id => {
                let (Some(od), Some(nd)) = (self.doc(o), self.doc(n)) else {
                    return;
                };
                out.size_delta += nd.size as i64 - od.size as i64;
                let fields = diff_fields(PATH, &od.value, &nd.value);
                if fields.is_empty() {
                    return;
                }
                let id = nd.value.get("id").and_then(Value::as_str).unwrap_or_default();
                let name = nd.name_or(id);
                let (ov, nv) = split_fields(&fields);
                out.push(
                    ChangeType::Modified,
                    ChangeCategory::Space,
                    "building",
                    id,
                    name,
                    PATH,
                    format!("Modified building '{name}': {}", field_list(&fields)),
                    Some(ov),
                    Some(nv),
                );
                diff.building_fields = fields;
            }
            (None, Some(n)) => {
                let Some(nd) = self.doc(n) else { return };
                out.size_delta += nd.size as i64;
                let id = nd.value.get("id").and_then(Value::as_str).unwrap_or_default();
                let name = nd.name_or(id);
                out.push(
                    ChangeType::Added,
                    ChangeCategory::Space,
                    "building",
                    id,
                    name,
                    PATH,
                    format!("Added building '{name}'"),
                    None,
                    Some(nd.value.clone()),
                );
                diff.building_added = true;
            }
            (Some(o), None) => {
                let Some(od) = self.doc(o) else { return };
                out.size_delta -= od.size as i64;
                let id = od.value.get("id").and_then(Value::as_str).unwrap_or_default();
                let name = od.name_or(id);
                out.push(
                    ChangeType::Deleted,
                    ChangeCategory::Space,
                    "building",
                    id,
                    name,
                    PATH,
                    format!("Deleted building '{name}'"),
                    Some(od.value.clone()),
                    None,
                );
                diff.building_removed = true;
            }
            _ => {}
        }
    }

    // -- flat categories (floors, rooms, files, points) ---------------------

    fn diff_leaves(
        &self,
        category: ChangeCategory,
        entity_type: &str,
        base: &str,
        old_tree: &ObjectId,
        new_tree: &ObjectId,
        out: &mut Collector,
    ) -> LeafDiff {
        let mut leaves = LeafDiff::default();
        let (Some(old), Some(new)) = (self.tree(old_tree), self.tree(new_tree)) else {
            return leaves;
        };

        for change in diff_entries(&old, &new) {
            let id = change.name().to_string();
            let path = format!("{base}/{id}");
            match change {
                EntryChange::Added(entry) => {
                    let Some(doc) = self.doc(entry) else { continue };
                    let name = doc.name_or(&id).to_string();
                    out.size_delta += doc.size as i64;
                    out.push(
                        ChangeType::Added,
                        category,
                        entity_type,
                        &id,
                        &name,
                        &path,
                        format!("Added {entity_type} '{name}'"),
                        None,
                        Some(doc.value.clone()),
                    );
                    leaves.added.push(EntityRef {
                        id,
                        name,
                        path,
                        size: doc.size,
                    });
                }
                EntryChange::Removed(entry) => {
                    let Some(doc) = self.doc(entry) else { continue };
                    let name = doc.name_or(&id).to_string();
                    out.size_delta -= doc.size as i64;
                    out.push(
                        ChangeType::Deleted,
                        category,
                        entity_type,
                        &id,
                        &name,
                        &path,
                        format!("Deleted {entity_type} '{name}'"),
                        Some(doc.value.clone()),
                        None,
                    );
                    leaves.removed.push(EntityRef {
                        id,
                        name,
                        path,
                        size: doc.size,
                    });
                }
                EntryChange::Modified { old, new } => {
                    let (Some(od), Some(nd)) = (self.doc(old), self.doc(new)) else {
                        continue;
                    };
                    out.size_delta += nd.size as i64 - od.size as i64;
                    let fields = diff_fields(&path, &od.value, &nd.value);
                    if fields.is_empty() {
                        continue;
                    }
                    let name = nd.name_or(&id).to_string();
                    let (ov, nv) = split_fields(&fields);
                    out.push(
                        ChangeType::Modified,
                        category,
                        entity_type,
                        &id,
                        &name,
                        &path,
                        format!("Modified {entity_type} '{name}': {}", field_list(&fields)),
                        Some(ov),
                        Some(nv),
                    );
                    leaves.modified.push(EntityModification {
                        id,
                        name,
                        path,
                        fields,
                    });
                }
            }
        }
        debug!(
            entity_type,
            added = leaves.added.len(),
            removed = leaves.removed.len(),
            modified = leaves.modified.len(),
            "diff phase 2"
        );
        leaves
    }

    // -- equipment ----------------------------------------------------------

    /// Entries of every type bucket whose subtree differs between sides,
    /// as `(bucket, entry)`.
    fn dirty_buckets(
        &self,
        old: &Tree,
        new: &Tree,
    ) -> (Vec<(String, TreeEntry)>, Vec<(String, TreeEntry)>) {
        let mut old_entries = Vec::new();
        let mut new_entries = Vec::new();
        for change in diff_entries(old, new) {
            let (o, n) = match change {
                EntryChange::Added(e) => (None, Some(e)),
                EntryChange::Removed(e) => (Some(e), None),
                EntryChange::Modified { old, new } => (Some(old), Some(new)),
            };
            for (side, bucket) in [(&mut old_entries, o), (&mut new_entries, n)] {
                let Some(bucket) = bucket else { continue };
                let Some(tree) = self.tree(&bucket.id) else { continue };
                side.extend(tree.entries.into_iter().map(|e| (bucket.name.clone(), e)));
            }
        }
        (old_entries, new_entries)
    }

    fn diff_equipment(
        &self,
        old_id: &ObjectId,
        new_id: &ObjectId,
        out: &mut Collector,
    ) -> EquipmentDiff {
        let mut diff = EquipmentDiff {
            changed: true,
            ..EquipmentDiff::default()
        };
        let (Some(old), Some(new)) = (self.tree(old_id), self.tree(new_id)) else {
            return diff;
        };
        let (old_entries, new_entries) = self.dirty_buckets(&old, &new);

        // Equipment ids are unique across buckets, so a type change shows up
        // as a modification rather than a remove/add pair.
        let (old_by_id, old_bucket) = index_by_id(&old_entries);
        let (new_by_id, new_bucket) = index_by_id(&new_entries);

        for change in diff_maps(&old_by_id, &new_by_id) {
            let id = change.name().to_string();
            match change {
                EntryChange::Added(entry) => {
                    let bucket = new_bucket.get(id.as_str()).copied().unwrap_or_default();
                    let Some(doc) = self.doc(entry) else { continue };
                    out.size_delta += doc.size as i64;
                    let item = self.equipment_ref(&id, bucket, &doc);
                    let at = item
                        .location
                        .as_deref()
                        .map(|l| format!(" at {l}"))
                        .unwrap_or_default();
                    out.push(
                        ChangeType::Added,
                        ChangeCategory::Equipment,
                        "equipment",
                        &id,
                        &item.name,
                        &item.path,
                        format!("Added equipment '{}' ({}){at}", item.name, item.equipment_type),
                        None,
                        Some(doc.value.clone()),
                    );
                    diff.added.push(item);
                }
                EntryChange::Removed(entry) => {
                    let bucket = old_bucket.get(id.as_str()).copied().unwrap_or_default();
                    let Some(doc) = self.doc(entry) else { continue };
                    out.size_delta -= doc.size as i64;
                    let item = self.equipment_ref(&id, bucket, &doc);
                    out.push(
                        ChangeType::Deleted,
                        ChangeCategory::Equipment,
                        "equipment",
                        &id,
                        &item.name,
                        &item.path,
                        format!("Deleted equipment '{}' ({})", item.name, item.equipment_type),
                        Some(doc.value.clone()),
                        None,
                    );
                    diff.removed.push(item);
                }
                EntryChange::Modified { old, new } => {
                    let bucket = new_bucket.get(id.as_str()).copied().unwrap_or_default();
                    let (Some(od), Some(nd)) = (self.doc(old), self.doc(new)) else {
                        continue;
                    };
                    out.size_delta += nd.size as i64 - od.size as i64;
                    let path = format!("items/{bucket}/{id}");
                    let fields = diff_fields(&path, &od.value, &nd.value);
                    if fields.is_empty() {
                        continue;
                    }
                    let name = nd.name_or(&id).to_string();
                    let mut description =
                        format!("Modified equipment '{name}': {}", field_list(&fields));
                    if fields.iter().any(|f| f.field == "location") {
                        let (from, to) = (od.location(), nd.location());
                        let distance = Location3::distance(from.as_ref(), to.as_ref());
                        let from = from.map(|l| l.to_string());
                        let to = to.map(|l| l.to_string());
                        description = format!(
                            "Moved equipment '{name}' from {} to {} ({distance:.2} m)",
                            from.as_deref().unwrap_or("(none)"),
                            to.as_deref().unwrap_or("(none)"),
                        );
                        diff.moved.push(EquipmentMove {
                            id: id.clone(),
                            name: name.clone(),
                            from,
                            to,
                            distance,
                        });
                    }
                    let (ov, nv) = split_fields(&fields);
                    out.push(
                        ChangeType::Modified,
                        ChangeCategory::Equipment,
                        "equipment",
                        &id,
                        &name,
                        &path,
                        description,
                        Some(ov),
                        Some(nv),
                    );
                    diff.modified.push(EntityModification {
                        id,
                        name,
                        path,
                        fields,
                    });
                }
            }
        }
        debug!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            modified = diff.modified.len(),
            moved = diff.moved.len(),
            "equipment diff"
        );
        diff
    }

    fn equipment_ref(&self, id: &str, bucket: &str, doc: &Doc) -> EquipmentRef {
        let equipment_type = doc
            .value
            .get("equipment_type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or(bucket)
            .to_string();
        EquipmentRef {
            id: id.to_string(),
            name: doc.name_or(id).to_string(),
            equipment_type,
            location: doc.location().map(|l| l.to_string()),
            path: format!("items/{bucket}/{id}"),
            size: doc.size,
        }
    }
}
