//! Rollback of live building state to a recorded version.
//!
//! A rollback resolves the target version, previews it against the current
//! one, destructively restores floors, rooms and equipment from the target
//! snapshot, optionally validates the result and optionally records a new
//! commit and tag so history shows the rollback happened.
//!
//! # Key Types
//!
//! - [`RollbackService`] -- runs the state machine
//! - [`RollbackOptions`] / [`RollbackResult`] -- inputs and outcome
//! - [`ValidationResult`] -- post-restore counts, warnings and errors

pub mod error;
pub mod restore;
pub mod service;
pub mod types;
pub mod validate;

pub use error::{Result, RollbackError};
pub use restore::{restore, RestoreReport};
pub use service::RollbackService;
pub use types::{RollbackOptions, RollbackResult, RollbackState, ValidationResult};
pub use validate::validate;
