//! Reference management for the Arx version-control engine.
//!
//! References are the human-readable entry points into the commit DAG,
//! analogous to git refs.
//!
//! # Architecture
//!
//! - **Branches** (`refs/heads/*`) are mutable pointers to commits, each with
//!   a policy record ([`Branch`]) describing protection and review rules.
//! - **Tags** (`refs/tags/*`) are created once and never moved.
//! - **Remote refs** (`refs/remotes/*`) are only written by sync.
//! - **HEAD** holds either `ref: refs/heads/<branch>` or a detached commit id.
//!
//! A ref file holds either a raw object id or a `ref: <path>` indirection.
//! Resolution follows at most ten indirections and fails rather than loop.
//! Every update appends `old new timestamp message` to the ref's reflog on a
//! best-effort basis.
//!
//! # Modules
//!
//! - [`error`] -- Error types for ref operations
//! - [`types`] -- [`RefValue`] and [`ReflogEntry`]
//! - [`traits`] -- The [`RefStore`] trait and all ref semantics
//! - [`names`] -- Name validation and path helpers
//! - [`branch`] -- Branch policy records
//! - [`fs`] -- [`FsRefStore`], the on-disk backend
//! - [`memory`] -- [`InMemoryRefStore`] for tests

pub mod branch;
pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod pattern;
pub mod traits;
pub mod types;

pub use branch::{Branch, BranchPolicy, BranchStatus, BranchType};
pub use error::{RefError, Result};
pub use fs::FsRefStore;
pub use memory::InMemoryRefStore;
pub use names::{
    branch_ref, remote_ref, tag_ref, validate_branch_name, validate_ref_path,
    validate_remote_name, validate_tag_name, HEAD, HEADS, REMOTES, TAGS,
};
pub use traits::{RefStore, MAX_SYMBOLIC_DEPTH};
pub use types::{RefValue, ReflogEntry};
