use std::fmt;
use std::time::Duration;

use arx_diff::DiffSummary;
use arx_store::SnapshotMetadata;
use arx_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RollbackError};
use crate::restore::RestoreReport;

// ---------------------------------------------------------------------------
// RollbackState
// ---------------------------------------------------------------------------

/// Steps of a rollback.
///
/// `Previewing -> Restoring -> Validating? -> Versioning? -> Done`, with any
/// step able to jump to `Failed`. A dry run goes `Previewing -> Done`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackState {
    Previewing,
    Restoring,
    Validating,
    Versioning,
    Done,
    Failed,
}

impl RollbackState {
    /// `Done` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RollbackState::Done | RollbackState::Failed)
    }
}

impl fmt::Display for RollbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RollbackState::Previewing => "previewing",
            RollbackState::Restoring => "restoring",
            RollbackState::Validating => "validating",
            RollbackState::Versioning => "versioning",
            RollbackState::Done => "done",
            RollbackState::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Caller choices for one rollback.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackOptions {
    /// Record a commit (and tag) for the rollback once it succeeds.
    pub create_version: bool,
    /// Commit message; a default naming the target is used when empty.
    pub message: String,
    /// Recount the live state afterwards and check referential integrity.
    pub validate_after: bool,
    /// Report what would be restored without touching live state.
    pub dry_run: bool,
}

impl RollbackOptions {
    /// Preview only.
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Restore, validate and record a version.
    pub fn full(message: impl Into<String>) -> Self {
        Self {
            create_version: true,
            message: message.into(),
            validate_after: true,
            dry_run: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

/// Outcome of the post-restore check.
///
/// Count mismatches are warnings. Entities attached to the wrong building
/// are errors and make the result invalid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub floor_count: u64,
    pub room_count: u64,
    pub equipment_count: u64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// RollbackResult
// ---------------------------------------------------------------------------

/// Everything a rollback did, including how it ended.
#[derive(Debug)]
pub struct RollbackResult {
    pub building_id: String,
    /// The target as given by the caller.
    pub target: String,
    /// Commit or snapshot the target resolved to.
    pub target_id: Option<ObjectId>,
    /// Snapshot restored from.
    pub target_snapshot: Option<ObjectId>,
    /// Commit HEAD resolved to before the rollback.
    pub previous_version: Option<ObjectId>,
    /// Final state, always terminal.
    pub state: RollbackState,
    /// Every state entered, in order.
    pub transitions: Vec<RollbackState>,
    /// Entity counts of the target snapshot.
    pub preview: SnapshotMetadata,
    /// Changes between the previous version and the target, when there was a
    /// previous version.
    pub changes: Option<DiffSummary>,
    pub restore: Option<RestoreReport>,
    pub validation: Option<ValidationResult>,
    /// Commit recorded for the rollback.
    pub new_version: Option<ObjectId>,
    pub tag: Option<String>,
    pub duration: Duration,
    pub error: Option<RollbackError>,
}

impl RollbackResult {
    pub(crate) fn new(building_id: &str, target: &str) -> Self {
        Self {
            building_id: building_id.to_string(),
            target: target.to_string(),
            target_id: None,
            target_snapshot: None,
            previous_version: None,
            state: RollbackState::Previewing,
            transitions: vec![RollbackState::Previewing],
            preview: SnapshotMetadata::default(),
            changes: None,
            restore: None,
            validation: None,
            new_version: None,
            tag: None,
            duration: Duration::ZERO,
            error: None,
        }
    }

    pub(crate) fn enter(&mut self, state: RollbackState) {
        self.state = state;
        self.transitions.push(state);
    }

    /// Returns `true` if the rollback reached `Done`.
    pub fn is_success(&self) -> bool {
        self.state == RollbackState::Done
    }

    /// Total entity changes detected against the previous version.
    pub fn total_changes(&self) -> usize {
        self.changes.as_ref().map_or(0, |c| c.total_changes)
    }

    /// Turn a failed rollback into its error.
    pub fn into_result(mut self) -> Result<Self> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_recorded() {
        let mut r = RollbackResult::new("b1", "main");
        r.enter(RollbackState::Restoring);
        r.enter(RollbackState::Done);
        assert_eq!(
            r.transitions,
            vec![
                RollbackState::Previewing,
                RollbackState::Restoring,
                RollbackState::Done
            ]
        );
        assert!(r.is_success());
        assert!(r.state.is_terminal());
    }

    #[test]
    fn into_result_surfaces_error() {
        let mut r = RollbackResult::new("b1", "nope");
        r.error = Some(RollbackError::VersionNotFound {
            target: "nope".into(),
        });
        r.enter(RollbackState::Failed);
        let err = r.into_result().unwrap_err();
        assert!(matches!(err, RollbackError::VersionNotFound { .. }));
    }

    #[test]
    fn state_display_and_serde_agree() {
        for state in [RollbackState::Previewing, RollbackState::Failed] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }

    #[test]
    fn option_presets() {
        assert!(RollbackOptions::dry_run().dry_run);
        let full = RollbackOptions::full("restore");
        assert!(full.create_version && full.validate_after && !full.dry_run);
    }
}
