//! The [`RefStore`] trait defining the reference storage interface.
//!
//! Backends provide raw one-hop storage (read, write, remove, enumerate),
//! an atomic compare-and-swap, reflog persistence and branch records. All
//! ref semantics (resolution, branches, tags, HEAD, listing) are default
//! methods on top of those primitives, so every backend behaves the same.

use std::collections::BTreeSet;

use arx_types::{Clock, ObjectId};
use tracing::{debug, info, warn};

use crate::branch::Branch;
use crate::error::{RefError, Result};
use crate::names::{
    branch_ref, tag_ref, validate_branch_name, validate_ref_path, validate_tag_name, HEAD, HEADS,
    REMOTES, TAGS,
};
use crate::pattern;
use crate::types::{RefValue, ReflogEntry};

/// Default maximum number of symbolic hops followed by [`RefStore::resolve`].
pub const MAX_SYMBOLIC_DEPTH: usize = 10;

/// Storage backend for named references.
///
/// The namespace follows git's layout:
///
/// - `HEAD`, normally `ref: refs/heads/<branch>`
/// - `refs/heads/*` for branches
/// - `refs/tags/*` for tags
/// - `refs/remotes/{remote}/*` for remote tracking refs
pub trait RefStore: Send + Sync {
    // -- primitives -------------------------------------------------------

    /// Read the stored value of `name` without following indirections.
    fn read(&self, name: &str) -> Result<Option<RefValue>>;

    /// Replace the stored value of `name`. Must be atomic: a failed write
    /// leaves the previous value intact. Does not touch the reflog.
    fn write(&self, name: &str, value: &RefValue) -> Result<()>;

    /// Remove `name`. Returns `true` if it existed. Does not touch the reflog.
    fn remove(&self, name: &str) -> Result<bool>;

    /// Every stored ref under `refs/`, sorted.
    fn names(&self) -> Result<Vec<String>>;

    /// Set `name` to `new` only if it currently holds `expected` (`None`
    /// meaning "does not exist"), then append a reflog entry. Fails with
    /// [`RefError::Conflict`] when the current value differs.
    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&RefValue>,
        new: &RefValue,
        message: &str,
    ) -> Result<()>;

    /// Append one entry to the reflog of `name`.
    fn append_log(&self, name: &str, entry: &ReflogEntry) -> Result<()>;

    /// The reflog of `name`, oldest first. Empty if there is none.
    fn reflog(&self, name: &str) -> Result<Vec<ReflogEntry>>;

    /// Every ref name that has a reflog, including deleted refs.
    fn logged_names(&self) -> Result<Vec<String>>;

    /// Persist a branch policy record.
    fn save_branch(&self, branch: &Branch) -> Result<()>;

    /// Load a branch policy record by short name.
    fn load_branch(&self, name: &str) -> Result<Option<Branch>>;

    /// Remove a branch policy record. Returns `true` if it existed.
    fn remove_branch(&self, name: &str) -> Result<bool>;

    /// Time source for reflog entries and branch records.
    fn clock(&self) -> &dyn Clock;

    /// Create any backing layout (directories). Idempotent.
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Repository name recorded on branch records.
    fn repository(&self) -> &str {
        ""
    }

    /// Maximum symbolic hops followed during resolution.
    fn symbolic_limit(&self) -> usize {
        MAX_SYMBOLIC_DEPTH
    }

    // -- reflog -----------------------------------------------------------

    /// Append a reflog entry, logging instead of failing if the append does.
    fn record(&self, name: &str, old: Option<RefValue>, new: Option<RefValue>, message: &str) {
        let entry = ReflogEntry::new(old, new, self.clock().unix_seconds(), message);
        if let Err(e) = self.append_log(name, &entry) {
            warn!(name, error = %e, "reflog append failed");
        }
    }

    // -- raw access -------------------------------------------------------

    /// Create the default layout and point `HEAD` at
    /// `refs/heads/<default_branch>` unless HEAD already exists.
    fn init(&self, default_branch: &str) -> Result<()> {
        validate_branch_name(default_branch)?;
        self.prepare()?;
        if self.read(HEAD)?.is_none() {
            let head = RefValue::Symbolic(branch_ref(default_branch));
            self.write(HEAD, &head)?;
            self.record(HEAD, None, Some(head), "init");
        }
        Ok(())
    }

    /// Set `name` to `value` and append to its reflog.
    fn update(&self, name: &str, value: RefValue, message: &str) -> Result<()> {
        validate_ref_path(name)?;
        let old = self.read(name)?;
        self.write(name, &value)?;
        debug!(name, value = %value, "ref update");
        self.record(name, old, Some(value), message);
        Ok(())
    }

    /// Delete `name`, recording the deletion in its reflog.
    fn delete(&self, name: &str, message: &str) -> Result<()> {
        validate_ref_path(name)?;
        let Some(old) = self.read(name)? else {
            return Err(RefError::NotFound {
                name: name.to_string(),
            });
        };
        self.remove(name)?;
        self.record(name, Some(old), None, message);
        Ok(())
    }

    // -- resolution -------------------------------------------------------

    /// Follow `ref:` indirections from `name` to an object id.
    ///
    /// Up to [`symbolic_limit`](Self::symbolic_limit) symbolic refs may be
    /// chained; one more fails with [`RefError::TooManySymbolicLevels`].
    fn resolve(&self, name: &str) -> Result<ObjectId> {
        let limit = self.symbolic_limit();
        let mut current = name.to_string();
        for _ in 0..=limit {
            match self.read(&current)? {
                None => return Err(RefError::NotFound { name: current }),
                Some(RefValue::Direct(id)) => return Ok(id),
                Some(RefValue::Symbolic(target)) => current = target,
            }
        }
        Err(RefError::TooManySymbolicLevels {
            name: name.to_string(),
            limit,
        })
    }

    /// Turn a user-supplied target into an object id.
    ///
    /// Tried in order: a full ref path (`HEAD`, `refs/...`), a branch, a tag,
    /// a remote-tracking ref, and finally a literal 64-character hex id.
    fn resolve_target(&self, target: &str) -> Result<ObjectId> {
        let candidates = [
            target.to_string(),
            format!("{HEADS}{target}"),
            format!("{TAGS}{target}"),
            format!("{REMOTES}{target}"),
        ];
        for candidate in &candidates {
            if validate_ref_path(candidate).is_ok() && self.read(candidate)?.is_some() {
                return self.resolve(candidate);
            }
        }
        if ObjectId::is_hex_id(target) {
            return ObjectId::from_hex(target).map_err(|_| RefError::InvalidTarget {
                target: target.to_string(),
            });
        }
        Err(RefError::InvalidTarget {
            target: target.to_string(),
        })
    }

    // -- HEAD -------------------------------------------------------------

    /// The raw value of HEAD.
    fn head(&self) -> Result<RefValue> {
        self.read(HEAD)?.ok_or_else(|| RefError::NotFound {
            name: HEAD.to_string(),
        })
    }

    /// Short name of the branch HEAD points at.
    fn current_branch(&self) -> Result<String> {
        match self.head()? {
            RefValue::Symbolic(target) => target
                .strip_prefix(HEADS)
                .map(str::to_string)
                .ok_or(RefError::DetachedHead),
            RefValue::Direct(_) => Err(RefError::DetachedHead),
        }
    }

    /// Point HEAD at an existing branch.
    fn checkout(&self, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;
        let path = branch_ref(branch);
        if self.read(&path)?.is_none() {
            return Err(RefError::NotFound { name: path });
        }
        let from = match self.read(HEAD)? {
            Some(RefValue::Symbolic(t)) => t.strip_prefix(HEADS).unwrap_or(t.as_str()).to_string(),
            Some(RefValue::Direct(id)) => id.short_hex(),
            None => String::from("(none)"),
        };
        self.update(
            HEAD,
            RefValue::Symbolic(path),
            &format!("checkout: moving from {from} to {branch}"),
        )?;
        info!(branch, "checked out branch");
        Ok(())
    }

    /// Detach HEAD at a specific object.
    fn detach_head(&self, id: ObjectId, message: &str) -> Result<()> {
        self.update(HEAD, RefValue::Direct(id), message)
    }

    // -- branches ---------------------------------------------------------

    /// Create `refs/heads/<name>` at `target` (a ref or a hex id) and store
    /// its policy record. Fails if the branch already exists.
    fn create_branch(&self, name: &str, target: &str) -> Result<ObjectId> {
        validate_branch_name(name)?;
        let path = branch_ref(name);
        if self.read(&path)?.is_some() {
            return Err(RefError::AlreadyExists { name: path });
        }
        let id = self.resolve_target(target)?;
        self.compare_and_swap(
            &path,
            None,
            &RefValue::Direct(id),
            &format!("branch: created from {target}"),
        )
        .map_err(|e| match e {
            RefError::Conflict { name, .. } => RefError::AlreadyExists { name },
            other => other,
        })?;
        self.save_branch(&Branch::new(self.repository(), name, id, self.clock().now()))?;
        info!(branch = name, target = %id, "created branch");
        Ok(id)
    }

    /// Delete a branch and its policy record.
    ///
    /// Fails for the checked-out branch and for protected branches.
    fn delete_branch(&self, name: &str) -> Result<()> {
        validate_branch_name(name)?;
        let path = branch_ref(name);
        if self.read(&path)?.is_none() {
            return Err(RefError::NotFound { name: path });
        }
        if matches!(self.current_branch(), Ok(current) if current == name) {
            return Err(RefError::DeleteCurrentBranch {
                name: name.to_string(),
            });
        }
        if self.load_branch(name)?.is_some_and(|b| b.protected) {
            return Err(RefError::ProtectedBranch {
                name: name.to_string(),
            });
        }
        self.delete(&path, "branch: deleted")?;
        self.remove_branch(name)?;
        info!(branch = name, "deleted branch");
        Ok(())
    }

    /// The branch record with `head_commit` refreshed from the ref.
    ///
    /// Branches created without a record get one with default policy.
    fn branch(&self, name: &str) -> Result<Branch> {
        let head = self.resolve(&branch_ref(name))?;
        let mut branch = match self.load_branch(name)? {
            Some(branch) => branch,
            None => Branch::new(self.repository(), name, head, self.clock().now()),
        };
        branch.head_commit = head;
        Ok(branch)
    }

    /// Short names of all branches, sorted.
    fn branches(&self) -> Result<Vec<String>> {
        Ok(self
            .names()?
            .into_iter()
            .filter_map(|n| n.strip_prefix(HEADS).map(str::to_string))
            .collect())
    }

    // -- tags -------------------------------------------------------------

    /// Create `refs/tags/<name>` at `target`. The message is kept in the
    /// tag's reflog. Fails if the tag already exists.
    fn create_tag(&self, name: &str, target: &str, message: &str) -> Result<ObjectId> {
        validate_tag_name(name)?;
        let path = tag_ref(name);
        if self.read(&path)?.is_some() {
            return Err(RefError::AlreadyExists { name: path });
        }
        let id = self.resolve_target(target)?;
        let message = if message.is_empty() {
            format!("tag: {name}")
        } else {
            format!("tag: {message}")
        };
        self.compare_and_swap(&path, None, &RefValue::Direct(id), &message)
            .map_err(|e| match e {
                RefError::Conflict { name, .. } => RefError::AlreadyExists { name },
                other => other,
            })?;
        info!(tag = name, target = %id, "created tag");
        Ok(id)
    }

    /// Delete a tag.
    fn delete_tag(&self, name: &str) -> Result<()> {
        validate_tag_name(name)?;
        self.delete(&tag_ref(name), "tag: deleted")
    }

    /// Short names of all tags, sorted.
    fn tags(&self) -> Result<Vec<String>> {
        Ok(self
            .names()?
            .into_iter()
            .filter_map(|n| n.strip_prefix(TAGS).map(str::to_string))
            .collect())
    }

    /// Tags whose value is exactly `id`.
    fn tags_pointing_at(&self, id: &ObjectId) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for tag in self.tags()? {
            if self.read(&tag_ref(&tag))?.and_then(|v| v.as_direct()) == Some(*id) {
                out.push(tag);
            }
        }
        Ok(out)
    }

    // -- enumeration ------------------------------------------------------

    /// Stored refs whose full path matches `pattern` (glob when it contains
    /// `*` or `?`, substring otherwise, everything when empty).
    fn list(&self, pattern: &str) -> Result<Vec<(String, RefValue)>> {
        let mut out = Vec::new();
        for name in self.names()? {
            if !pattern::matches(pattern, &name) {
                continue;
            }
            if let Some(value) = self.read(&name)? {
                out.push((name, value));
            }
        }
        Ok(out)
    }

    /// Every object id a ref or reflog entry still points at. These are the
    /// roots for garbage collection.
    fn gc_roots(&self) -> Result<Vec<ObjectId>> {
        let mut roots = BTreeSet::new();
        let mut names = self.names()?;
        names.push(HEAD.to_string());
        for name in &names {
            if let Some(RefValue::Direct(id)) = self.read(name)? {
                roots.insert(id);
            }
        }
        for name in self.logged_names()? {
            for entry in self.reflog(&name)? {
                for value in [entry.old, entry.new].into_iter().flatten() {
                    if let RefValue::Direct(id) = value {
                        roots.insert(id);
                    }
                }
            }
        }
        roots.remove(&ObjectId::null());
        Ok(roots.into_iter().collect())
    }
}
