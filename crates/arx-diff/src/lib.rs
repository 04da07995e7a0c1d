//! Structural diff between building snapshots.
//!
//! Comparison runs in three phases, each narrowing the work for the next:
//! category subtree ids, then tree entries by name, then fields of modified
//! entity blobs. Unchanged categories cost one id comparison.
//!
//! # Key Types
//!
//! - [`DiffService`] -- runs the comparison
//! - [`DiffResult`] -- per-domain diffs, [`DiffSummary`] counts and a flat
//!   [`DetailedChange`] list for reports
//! - [`FieldChange`] -- one differing field of one entity

pub mod entries;
pub mod error;
pub mod fields;
pub mod service;
pub mod types;

pub use entries::{diff_entries, EntryChange};
pub use error::{DiffError, Result};
pub use fields::{diff_fields, FieldChange, IGNORED_FIELDS};
pub use service::DiffService;
pub use types::{
    BuildingDiff, ChangeCategory, ChangeType, DetailedChange, DiffResult, DiffSummary,
    EntityModification, EntityRef, EquipmentDiff, EquipmentMove, EquipmentRef, FilesDiff,
    OperationsDiff, Severity,
};
