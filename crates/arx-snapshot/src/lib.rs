//! Building snapshots for the Arx version-control engine.
//!
//! A snapshot is one complete, immutable state of a building, stored as a
//! small DAG of content-addressed objects: entity blobs grouped into four
//! category trees (`space`, `items`, `files`, `operations`) under a snapshot
//! object that also carries denormalized entity counts.
//!
//! This crate also defines the interfaces of the live (relational)
//! repositories snapshots are captured from and restored into, plus an
//! in-memory implementation used by tests and embedders.

pub mod builder;
pub mod error;
pub mod layout;
pub mod memory;
pub mod reader;
pub mod repository;
pub mod state;

pub use builder::SnapshotBuilder;
pub use error::{RepositoryError, RepositoryResult, SnapshotError, SnapshotResult};
pub use memory::InMemoryLiveStore;
pub use reader::{empty_tree_id, SnapshotReader, SpaceParts};
pub use repository::{
    AttachmentRepository, BasPointRepository, BuildingRepository, EquipmentRepository,
    FloorRepository, LiveRepositories, RoomRepository,
};
pub use state::BuildingState;
