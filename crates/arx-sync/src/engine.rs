//! Push and pull between a local repository and a [`RemoteTransport`].
//!
//! Push sends every object reachable from the pushed refs except what the
//! remote can already reach, then moves the remote refs with
//! compare-and-swap updates. Pull walks the remote graph level by level,
//! fetching only ids missing locally, and then overwrites local branches and
//! tags with the remote values. Nothing is ever merged.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arx_refs::{
    branch_ref, remote_ref, tag_ref, validate_remote_name, RefError, RefStore, RefValue, HEADS,
    TAGS,
};
use arx_store::{reachable, references, Object, ObjectStore, StoreError, StoreResult};
use arx_types::ObjectId;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteTransport;
use crate::types::{Overwrite, PullReport, PushReport, RefUpdate};

/// Objects per `fetch_objects` / `push_objects` call.
pub const BATCH_SIZE: usize = 256;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PullOptions {
    /// Ask for diverged refs to be merged. Merging is not supported, so a
    /// diverged ref then fails the pull instead of being overwritten.
    pub merge: bool,
}

/// Synchronizes one local repository with remotes.
pub struct SyncEngine {
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
}

impl SyncEngine {
    pub fn new(objects: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>) -> Self {
        Self { objects, refs }
    }

    // -- push -------------------------------------------------------------

    /// Push `refs` (short or full names) to `remote`. An empty list pushes
    /// every local branch and tag.
    pub async fn push(
        &self,
        remote: &dyn RemoteTransport,
        remote_name: &str,
        refs: &[String],
    ) -> SyncResult<PushReport> {
        validate_remote_name(remote_name)?;
        let local = if refs.is_empty() {
            self.publishable()?
        } else {
            refs.iter()
                .map(|name| self.expand(name))
                .collect::<SyncResult<Vec<_>>>()?
        };
        let advertised = advertised_ids(remote).await?;

        let mut report = PushReport::default();
        let mut updates = Vec::new();
        for (name, id) in local {
            let old = advertised.get(&name).copied();
            if old == Some(id) {
                report.up_to_date.push(name);
            } else {
                updates.push(RefUpdate { name, old, new: id });
            }
        }
        if updates.is_empty() {
            info!(remote = remote_name, "everything up to date");
            return Ok(report);
        }

        let mut known = Vec::new();
        for id in advertised.values() {
            if self.objects.exists(id)? {
                known.push(*id);
            }
        }
        let exclude = reachable(self.objects.as_ref(), known, &HashSet::new())?;
        let mut ids: Vec<ObjectId> =
            reachable(self.objects.as_ref(), updates.iter().map(|u| u.new), &exclude)?
                .into_iter()
                .collect();
        ids.sort();

        for chunk in ids.chunks(BATCH_SIZE) {
            let batch = chunk
                .iter()
                .map(|id| self.objects.read(id))
                .collect::<StoreResult<Vec<Object>>>()?;
            report.objects_sent += remote.push_objects(&batch).await?;
            debug!(sent = report.objects_sent, total = ids.len(), "push progress");
        }

        let targets: HashMap<&str, ObjectId> =
            updates.iter().map(|u| (u.name.as_str(), u.new)).collect();
        for result in remote.update_refs(&updates).await? {
            if !result.accepted {
                warn!(name = %result.name, reason = ?result.reason, "push rejected");
                report.rejected.push(result);
                continue;
            }
            if let (Some(branch), Some(id)) = (
                result.name.strip_prefix(HEADS),
                targets.get(result.name.as_str()),
            ) {
                self.refs.update(
                    &remote_ref(remote_name, branch),
                    RefValue::Direct(*id),
                    &format!("push: {remote_name}"),
                )?;
            }
            report.updated.push(result.name);
        }

        info!(
            remote = remote_name,
            objects = report.objects_sent,
            updated = report.updated.len(),
            rejected = report.rejected.len(),
            "push complete"
        );
        Ok(report)
    }

    /// Every local branch and tag holding an object id.
    fn publishable(&self) -> SyncResult<Vec<(String, ObjectId)>> {
        let mut out = Vec::new();
        for name in self.refs.names()? {
            if !name.starts_with(HEADS) && !name.starts_with(TAGS) {
                continue;
            }
            if let Some(RefValue::Direct(id)) = self.refs.read(&name)? {
                out.push((name, id));
            }
        }
        Ok(out)
    }

    /// Full ref path and id for a short branch or tag name or a full path.
    fn expand(&self, name: &str) -> SyncResult<(String, ObjectId)> {
        let candidates = if name.starts_with("refs/") {
            vec![name.to_string()]
        } else {
            vec![branch_ref(name), tag_ref(name)]
        };
        for candidate in candidates {
            if let Some(RefValue::Direct(id)) = self.refs.read(&candidate)? {
                return Ok((candidate, id));
            }
        }
        Err(RefError::NotFound {
            name: name.to_string(),
        }
        .into())
    }

    // -- pull -------------------------------------------------------------

    /// Fetch everything `remote` has that is missing locally, record the
    /// remote branches under `refs/remotes/<remote_name>/`, and overwrite
    /// local branches and tags with the remote values.
    pub async fn pull(
        &self,
        remote: &dyn RemoteTransport,
        remote_name: &str,
        options: &PullOptions,
    ) -> SyncResult<PullReport> {
        validate_remote_name(remote_name)?;
        let mut tips: Vec<(String, ObjectId)> = Vec::new();
        for r in remote.list_refs().await? {
            if !r.name.starts_with(HEADS) && !r.name.starts_with(TAGS) {
                continue;
            }
            if let Some(id) = r.id()? {
                tips.push((r.name, id));
            }
        }

        let mut report = PullReport {
            objects_fetched: self
                .fetch_missing(remote, tips.iter().map(|(_, id)| *id))
                .await?,
            ..PullReport::default()
        };

        // Decide every ref before touching any, so a refused merge leaves
        // the local refs as they were.
        let mut planned = Vec::new();
        for (name, id) in &tips {
            match self.refs.read(name)? {
                Some(RefValue::Direct(current)) if current == *id => {}
                Some(RefValue::Direct(current)) => {
                    let remote_history = reachable(self.objects.as_ref(), [*id], &HashSet::new())?;
                    if !remote_history.contains(&current) {
                        if options.merge {
                            return Err(SyncError::MergeUnsupported { name: name.clone() });
                        }
                        warn!(name, local = %current, remote = %id, "diverged; taking remote value");
                        report.overwritten.push(Overwrite {
                            name: name.clone(),
                            old: current,
                            new: *id,
                        });
                    }
                    planned.push((name, *id));
                }
                _ => planned.push((name, *id)),
            }
        }

        let message = format!("pull: {remote_name}");
        for (name, id) in &tips {
            let Some(branch) = name.strip_prefix(HEADS) else {
                continue;
            };
            let tracking = remote_ref(remote_name, branch);
            if self.refs.read(&tracking)? != Some(RefValue::Direct(*id)) {
                self.refs.update(&tracking, RefValue::Direct(*id), &message)?;
            }
            report.tracking.push(tracking);
        }
        for (name, id) in planned {
            self.refs.update(name, RefValue::Direct(id), &message)?;
            report.updated.push(name.clone());
        }

        info!(
            remote = remote_name,
            objects = report.objects_fetched,
            updated = report.updated.len(),
            overwritten = report.overwritten.len(),
            "pull complete"
        );
        Ok(report)
    }

    /// Breadth-first fetch of every object reachable from `roots` that is
    /// not stored locally. Returns the number of objects stored.
    async fn fetch_missing(
        &self,
        remote: &dyn RemoteTransport,
        roots: impl IntoIterator<Item = ObjectId>,
    ) -> SyncResult<usize> {
        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut frontier = Vec::new();
        for id in roots {
            if seen.insert(id) && !self.objects.exists(&id)? {
                frontier.push(id);
            }
        }

        let mut fetched = 0;
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for chunk in frontier.chunks(BATCH_SIZE) {
                let objects = remote.fetch_objects(chunk).await?;
                check_batch(chunk, &objects)?;
                fetched += self.objects.write_batch(&objects)?.len();
                for object in &objects {
                    for child in references(object)? {
                        if seen.insert(child) && !self.objects.exists(&child)? {
                            next.push(child);
                        }
                    }
                }
            }
            debug!(level = frontier.len(), next = next.len(), "fetched level");
            frontier = next;
        }
        Ok(fetched)
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine").finish_non_exhaustive()
    }
}

/// The remote's direct refs by name.
async fn advertised_ids(remote: &dyn RemoteTransport) -> SyncResult<HashMap<String, ObjectId>> {
    let mut out = HashMap::new();
    for r in remote.list_refs().await? {
        if let Some(id) = r.id()? {
            out.insert(r.name, id);
        }
    }
    Ok(out)
}

/// The remote must answer with exactly the requested objects.
fn check_batch(requested: &[ObjectId], objects: &[Object]) -> SyncResult<()> {
    let wanted: HashSet<&ObjectId> = requested.iter().collect();
    if let Some(extra) = objects.iter().find(|o| !wanted.contains(&o.id)) {
        return Err(SyncError::Decode(format!(
            "remote sent unrequested object {}",
            extra.id
        )));
    }
    let got: HashSet<&ObjectId> = objects.iter().map(|o| &o.id).collect();
    if let Some(missing) = requested.iter().find(|id| !got.contains(id)) {
        return Err(StoreError::NotFound(*missing).into());
    }
    Ok(())
}
