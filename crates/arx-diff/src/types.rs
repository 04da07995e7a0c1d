//! Diff result types.

use std::collections::BTreeMap;

use arx_types::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fields::FieldChange;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

/// Domain area a change belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeCategory {
    Space,
    Equipment,
    Files,
    Operations,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Minor,
    Major,
}

impl Severity {
    /// Deletions are minor, new floors are major, everything else is info.
    pub fn classify(change: ChangeType, entity_type: &str) -> Self {
        match (change, entity_type) {
            (ChangeType::Deleted, _) => Severity::Minor,
            (ChangeType::Added, "floor") => Severity::Major,
            _ => Severity::Info,
        }
    }
}

/// A flat, render-ready description of one change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetailedChange {
    pub change_type: ChangeType,
    pub category: ChangeCategory,
    pub entity_type: String,
    pub entity_id: String,
    pub entity_name: String,
    pub path: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    pub severity: Severity,
}

/// An entity present on only one side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
    pub path: String,
    /// Stored blob size in bytes.
    pub size: u64,
}

/// An entity present on both sides with differing fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityModification {
    pub id: String,
    pub name: String,
    pub path: String,
    pub fields: Vec<FieldChange>,
}

/// Changes to the building record, floors and rooms.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingDiff {
    pub changed: bool,
    /// Field changes to the building record itself.
    pub building_fields: Vec<FieldChange>,
    /// The building record exists only on the newer side.
    pub building_added: bool,
    /// The building record exists only on the older side.
    pub building_removed: bool,
    pub floors_added: Vec<EntityRef>,
    pub floors_removed: Vec<EntityRef>,
    pub floors_modified: Vec<EntityModification>,
    pub rooms_added: Vec<EntityRef>,
    pub rooms_removed: Vec<EntityRef>,
    pub rooms_modified: Vec<EntityModification>,
}

/// An equipment item present on one side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRef {
    pub id: String,
    pub name: String,
    pub equipment_type: String,
    /// Formatted as `(x, y, z)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub path: String,
    pub size: u64,
}

/// An equipment item whose location changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquipmentMove {
    pub id: String,
    pub name: String,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Euclidean distance; 0 when either side has no location.
    pub distance: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentDiff {
    pub changed: bool,
    pub added: Vec<EquipmentRef>,
    pub removed: Vec<EquipmentRef>,
    pub modified: Vec<EntityModification>,
    pub moved: Vec<EquipmentMove>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilesDiff {
    pub changed: bool,
    pub added: Vec<EntityRef>,
    pub removed: Vec<EntityRef>,
    pub modified: Vec<EntityModification>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationsDiff {
    pub changed: bool,
    pub added: Vec<EntityRef>,
    pub removed: Vec<EntityRef>,
    pub modified: Vec<EntityModification>,
}

/// Aggregated counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub space_changed: bool,
    pub items_changed: bool,
    pub files_changed: bool,
    pub operations_changed: bool,

    pub building_modified: bool,
    pub floors_added: usize,
    pub floors_removed: usize,
    pub floors_modified: usize,
    pub rooms_added: usize,
    pub rooms_removed: usize,
    pub rooms_modified: usize,
    pub equipment_added: usize,
    pub equipment_removed: usize,
    pub equipment_modified: usize,
    pub equipment_moved: usize,
    pub files_added: usize,
    pub files_removed: usize,
    pub files_modified: usize,
    pub points_added: usize,
    pub points_removed: usize,
    pub points_modified: usize,

    /// Net change in stored blob bytes.
    pub size_delta: i64,
    pub total_changes: usize,
}

impl DiffSummary {
    /// True when no category changed.
    pub fn is_empty(&self) -> bool {
        self.total_changes == 0
            && !(self.space_changed
                || self.items_changed
                || self.files_changed
                || self.operations_changed)
    }

    /// Entity-level changes plus one for a modified building record.
    pub fn compute_total(&self) -> usize {
        usize::from(self.building_modified)
            + self.floors_added
            + self.floors_removed
            + self.floors_modified
            + self.rooms_added
            + self.rooms_removed
            + self.rooms_modified
            + self.equipment_added
            + self.equipment_removed
            + self.equipment_modified
            + self.files_added
            + self.files_removed
            + self.files_modified
            + self.points_added
            + self.points_removed
            + self.points_modified
    }

    /// Non-zero counters, as recorded in a commit's `changes` field.
    pub fn counters(&self) -> BTreeMap<String, u64> {
        let pairs = [
            ("building_modified", usize::from(self.building_modified)),
            ("floors_added", self.floors_added),
            ("floors_removed", self.floors_removed),
            ("floors_modified", self.floors_modified),
            ("rooms_added", self.rooms_added),
            ("rooms_removed", self.rooms_removed),
            ("rooms_modified", self.rooms_modified),
            ("equipment_added", self.equipment_added),
            ("equipment_removed", self.equipment_removed),
            ("equipment_modified", self.equipment_modified),
            ("equipment_moved", self.equipment_moved),
            ("files_added", self.files_added),
            ("files_removed", self.files_removed),
            ("files_modified", self.files_modified),
            ("points_added", self.points_added),
            ("points_removed", self.points_removed),
            ("points_modified", self.points_modified),
            ("total_changes", self.total_changes),
        ];
        pairs
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .map(|(k, n)| (k.to_string(), n as u64))
            .collect()
    }
}

/// Complete comparison of two snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Label of the older side (a ref name or commit id).
    pub from: String,
    pub to: String,
    pub from_snapshot: ObjectId,
    pub to_snapshot: ObjectId,
    pub building: BuildingDiff,
    pub equipment: EquipmentDiff,
    pub files: FilesDiff,
    pub operations: OperationsDiff,
    pub summary: DiffSummary,
    pub changes: Vec<DetailedChange>,
}

impl DiffResult {
    /// Replace the side labels (e.g. with the ref names the caller used).
    pub fn with_labels(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = from.into();
        self.to = to.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
    }

    /// Changes at or above `severity`.
    pub fn changes_at_least(&self, severity: Severity) -> impl Iterator<Item = &DetailedChange> {
        self.changes.iter().filter(move |c| c.severity >= severity)
    }
}
