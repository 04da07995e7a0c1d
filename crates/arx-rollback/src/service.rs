//! The rollback state machine.
//!
//! Rollback restores first and verifies afterwards. The live repositories
//! are not transactional, so a failed step leaves whatever it already wrote
//! in place and the result records where it stopped. Callers must serialize
//! rollbacks and commits on the same building themselves.

use std::sync::Arc;
use std::time::Instant;

use arx_diff::DiffService;
use arx_refs::{RefError, RefStore, RefValue, HEAD};
use arx_snapshot::{LiveRepositories, SnapshotReader};
use arx_store::{CommitObject, Metadata, ObjectKind, ObjectStore};
use arx_types::{Clock, ObjectId, SystemClock};
use tracing::{debug, info, warn};

use crate::error::{Result, RollbackError};
use crate::restore::restore;
use crate::types::{RollbackOptions, RollbackResult, RollbackState};
use crate::validate::validate;

const DEFAULT_AUTHOR: &str = "arx";
const DEFAULT_EMAIL: &str = "arx@localhost";

/// Restores a building's live state to a recorded version.
pub struct RollbackService {
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    live: LiveRepositories,
    clock: Arc<dyn Clock>,
    author: String,
    email: String,
}

impl RollbackService {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
        live: LiveRepositories,
    ) -> Self {
        Self {
            objects,
            refs,
            live,
            clock: Arc::new(SystemClock),
            author: DEFAULT_AUTHOR.to_string(),
            email: DEFAULT_EMAIL.to_string(),
        }
    }

    /// Use `clock` for commit timestamps and rollback tag names.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Identity recorded on rollback commits.
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author = name.into();
        self.email = email.into();
        self
    }

    /// Roll `building_id` back to `target` (a ref name or a hex id of a
    /// commit, snapshot or tree).
    ///
    /// Never panics on failure: the returned result is in the `Failed` state
    /// with the error attached. Use [`RollbackResult::into_result`] to get a
    /// `Result`.
    pub fn rollback(
        &self,
        building_id: &str,
        target: &str,
        options: &RollbackOptions,
    ) -> RollbackResult {
        let started = Instant::now();
        let mut result = RollbackResult::new(building_id, target);
        info!(building_id, target, dry_run = options.dry_run, "rollback started");

        match self.run(building_id, target, options, &mut result) {
            Ok(()) => {
                result.enter(RollbackState::Done);
                info!(
                    building_id,
                    target,
                    changes = result.total_changes(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "rollback done"
                );
            }
            Err(e) => {
                warn!(building_id, target, state = %result.state, error = %e, "rollback failed");
                result.error = Some(e);
                result.enter(RollbackState::Failed);
            }
        }
        result.duration = started.elapsed();
        result
    }

    fn run(
        &self,
        building_id: &str,
        target: &str,
        options: &RollbackOptions,
        result: &mut RollbackResult,
    ) -> Result<()> {
        let reader = SnapshotReader::new(self.objects.as_ref());

        // Previewing.
        let target_id = self.resolve_version(target)?;
        let snapshot_id = self.snapshot_of(&target_id)?;
        result.target_id = Some(target_id);
        result.target_snapshot = Some(snapshot_id);

        let root = reader.root(&snapshot_id)?;
        if !root.building_id.is_empty() && root.building_id != building_id {
            return Err(RollbackError::BuildingMismatch {
                expected: building_id.to_string(),
                found: root.building_id,
            });
        }
        result.preview = reader.counts(&snapshot_id)?;

        let previous = self.current_version()?;
        result.previous_version = previous;
        if let Some(prev) = previous {
            let diff = DiffService::new(self.objects.as_ref()).diff(&prev, &snapshot_id)?;
            result.changes = Some(diff.summary);
        }
        debug!(
            building_id,
            snapshot = %snapshot_id,
            floors = result.preview.floor_count,
            equipment = result.preview.equipment_count,
            "rollback preview"
        );
        if options.dry_run {
            return Ok(());
        }

        result.enter(RollbackState::Restoring);
        let state = reader.state(&snapshot_id)?;
        result.restore = Some(restore(&self.live, building_id, &state)?);

        if options.validate_after {
            result.enter(RollbackState::Validating);
            let validation = validate(&self.live, building_id, &root.metadata, &state)?;
            let errors = validation.errors.clone();
            result.validation = Some(validation);
            if !errors.is_empty() {
                return Err(RollbackError::ValidationFailed { errors });
            }
        }

        if options.create_version {
            result.enter(RollbackState::Versioning);
            self.record_version(target, snapshot_id, options, result)?;
        }
        Ok(())
    }

    /// Object id named by `target`, which must exist in the store.
    fn resolve_version(&self, target: &str) -> Result<ObjectId> {
        let not_found = || RollbackError::VersionNotFound {
            target: target.to_string(),
        };
        let id = match self.refs.resolve_target(target) {
            Ok(id) => id,
            Err(RefError::NotFound { .. } | RefError::InvalidTarget { .. }) => {
                return Err(not_found())
            }
            Err(e) => return Err(e.into()),
        };
        if !self.objects.exists(&id)? {
            return Err(not_found());
        }
        Ok(id)
    }

    /// The snapshot a commit records; other objects are their own snapshot.
    fn snapshot_of(&self, id: &ObjectId) -> Result<ObjectId> {
        let object = self.objects.read(id)?;
        if object.kind == ObjectKind::Commit {
            return Ok(CommitObject::from_object(&object)?.tree);
        }
        Ok(*id)
    }

    /// The commit HEAD resolves to, if any.
    fn current_version(&self) -> Result<Option<ObjectId>> {
        match self.refs.resolve(HEAD) {
            Ok(id) => Ok(Some(id)),
            Err(RefError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Commit the target snapshot on top of HEAD, advance HEAD's branch and
    /// tag the new commit `<previous tag or short id>-rollback-<unix seconds>`.
    /// A tag that cannot be created is logged and left out of the result.
    fn record_version(
        &self,
        target: &str,
        snapshot_id: ObjectId,
        options: &RollbackOptions,
        result: &mut RollbackResult,
    ) -> Result<()> {
        let previous = result.previous_version;
        let message = if options.message.is_empty() {
            format!("Rollback to {target}")
        } else {
            options.message.clone()
        };
        let commit = CommitObject {
            parents: previous.into_iter().collect(),
            author: self.author.clone(),
            email: self.email.clone(),
            message: message.clone(),
            timestamp: self.clock.now(),
            tree: snapshot_id,
            changes: result
                .changes
                .as_ref()
                .map(|c| c.counters())
                .unwrap_or_default(),
        };
        let id = self
            .objects
            .write(ObjectKind::Commit, &commit.to_content()?, &Metadata::new())?;

        let base = match previous {
            Some(prev) => self
                .refs
                .tags_pointing_at(&prev)?
                .into_iter()
                .next()
                .unwrap_or_else(|| prev.short_hex()),
            None => "root".to_string(),
        };
        let tag = format!("{base}-rollback-{}", self.clock.unix_seconds());

        let reflog = format!("rollback: {target}");
        match self.refs.head()? {
            RefValue::Symbolic(branch) => {
                let expected = previous.map(RefValue::Direct);
                self.refs
                    .compare_and_swap(&branch, expected.as_ref(), &RefValue::Direct(id), &reflog)?;
            }
            RefValue::Direct(_) => self.refs.detach_head(id, &reflog)?,
        }
        // The version is recorded once HEAD has moved; the tag is a label.
        result.new_version = Some(id);

        match self.refs.create_tag(&tag, &id.to_hex(), &message) {
            Ok(_) => {
                info!(commit = %id, tag = %tag, "recorded rollback version");
                result.tag = Some(tag);
            }
            Err(e) => warn!(commit = %id, tag = %tag, error = %e, "rollback tag not created"),
        }
        Ok(())
    }
}
