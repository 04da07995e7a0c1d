//! On-disk Arx repositories.
//!
//! A repository lives in a `.arx/` directory next to the data it versions:
//!
//! ```text
//! .arx/
//!   repo.json      {version, name, description, created, updated}
//!   config.json    {user, core, remotes}
//!   HEAD
//!   refs/heads/... refs/tags/... refs/remotes/...
//!   logs/...       reflogs
//!   branches/...   branch policy records
//!   objects/xx/... compressed objects
//! ```
//!
//! [`Repository`] ties the object store, ref store, snapshot, diff,
//! rollback and sync crates together behind ref-name based operations.

pub mod config;
pub mod error;
pub mod repository;

pub use config::{CoreConfig, RemoteConfig, RepoConfig, RepoMeta, UserConfig};
pub use error::{RepoError, RepoResult};
pub use repository::{CommitInfo, LogEntry, Repository, ARX_DIR};
