//! In-memory reference store for testing and ephemeral use.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use arx_types::{Clock, SystemClock};

use crate::branch::Branch;
use crate::error::{RefError, Result};
use crate::names::{validate_branch_name, validate_ref_path};
use crate::traits::RefStore;
use crate::types::{RefValue, ReflogEntry};

/// An in-memory implementation of [`RefStore`].
///
/// All data lives in ordered maps behind `RwLock`s and is lost when the
/// store is dropped.
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, RefValue>>,
    logs: RwLock<BTreeMap<String, Vec<ReflogEntry>>>,
    branches: RwLock<BTreeMap<String, Branch>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a new empty ref store with an injected clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            refs: RwLock::new(BTreeMap::new()),
            logs: RwLock::new(BTreeMap::new()),
            branches: RwLock::new(BTreeMap::new()),
            clock,
        }
    }
}

impl Default for InMemoryRefStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RefStore for InMemoryRefStore {
    fn read(&self, name: &str) -> Result<Option<RefValue>> {
        validate_ref_path(name)?;
        let refs = self.refs.read().expect("lock poisoned");
        Ok(refs.get(name).cloned())
    }

    fn write(&self, name: &str, value: &RefValue) -> Result<()> {
        validate_ref_path(name)?;
        let mut refs = self.refs.write().expect("lock poisoned");
        refs.insert(name.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool> {
        validate_ref_path(name)?;
        let mut refs = self.refs.write().expect("lock poisoned");
        Ok(refs.remove(name).is_some())
    }

    fn names(&self) -> Result<Vec<String>> {
        let refs = self.refs.read().expect("lock poisoned");
        Ok(refs
            .keys()
            .filter(|k| k.starts_with("refs/"))
            .cloned()
            .collect())
    }

    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&RefValue>,
        new: &RefValue,
        message: &str,
    ) -> Result<()> {
        validate_ref_path(name)?;
        let old = {
            let mut refs = self.refs.write().expect("lock poisoned");
            let current = refs.get(name);
            if current != expected {
                return Err(RefError::Conflict {
                    name: name.to_string(),
                    expected: expected.map_or_else(|| "(none)".into(), ToString::to_string),
                    actual: current.map_or_else(|| "(none)".into(), ToString::to_string),
                });
            }
            refs.insert(name.to_string(), new.clone())
        };
        self.record(name, old, Some(new.clone()), message);
        Ok(())
    }

    fn append_log(&self, name: &str, entry: &ReflogEntry) -> Result<()> {
        let mut logs = self.logs.write().expect("lock poisoned");
        logs.entry(name.to_string()).or_default().push(entry.clone());
        Ok(())
    }

    fn reflog(&self, name: &str) -> Result<Vec<ReflogEntry>> {
        validate_ref_path(name)?;
        let logs = self.logs.read().expect("lock poisoned");
        Ok(logs.get(name).cloned().unwrap_or_default())
    }

    fn logged_names(&self) -> Result<Vec<String>> {
        let logs = self.logs.read().expect("lock poisoned");
        Ok(logs.keys().cloned().collect())
    }

    fn save_branch(&self, branch: &Branch) -> Result<()> {
        validate_branch_name(&branch.name)?;
        let mut branches = self.branches.write().expect("lock poisoned");
        branches.insert(branch.name.clone(), branch.clone());
        Ok(())
    }

    fn load_branch(&self, name: &str) -> Result<Option<Branch>> {
        validate_branch_name(name)?;
        let branches = self.branches.read().expect("lock poisoned");
        Ok(branches.get(name).cloned())
    }

    fn remove_branch(&self, name: &str) -> Result<bool> {
        validate_branch_name(name)?;
        let mut branches = self.branches.write().expect("lock poisoned");
        Ok(branches.remove(name).is_some())
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

impl std::fmt::Debug for InMemoryRefStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let refs = self.refs.read().expect("lock poisoned");
        f.debug_struct("InMemoryRefStore")
            .field("ref_count", &refs.len())
            .finish()
    }
}
