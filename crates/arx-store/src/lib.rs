//! Content-addressed object storage for the Arx version-control engine.
//!
//! This crate implements a hash-keyed object store analogous to git's
//! `.git/objects/` directory. Every versioned piece of a building -- entity
//! blobs, category trees, snapshots, commits -- is an immutable object
//! identified by the BLAKE3 digest of its header and content.
//!
//! # Object Types
//!
//! - [`ObjectKind::Blob`] -- one serialized entity
//! - [`Tree`] -- ordered listing mapping names to child objects
//! - [`SnapshotObject`] -- the four category subtrees of one building state
//! - [`CommitObject`] -- history node pointing at a snapshot
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- zstd-compressed files sharded as `objects/ab/cdef...`
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Writes are idempotent: writing an existing id is a no-op.
//! 3. Write-then-link: callers update refs only after the object write returns.
//! 4. Reads recompute the id and reject objects whose bytes do not hash back.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod gc;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod traits;
pub mod walk;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use gc::{collect_garbage, GcReport};
pub use hasher::ContentHasher;
pub use memory::InMemoryObjectStore;
pub use object::{
    CommitObject, EntryMode, Metadata, Object, ObjectKind, SnapshotMetadata, SnapshotObject, Tree,
    TreeEntry,
};
pub use traits::{IdIter, ObjectStore};
pub use walk::{reachable, references};
