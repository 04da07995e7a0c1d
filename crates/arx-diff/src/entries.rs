//! Entry-level comparison of two trees.

use std::collections::BTreeMap;

use arx_store::{Tree, TreeEntry};

/// How one name differs between two trees.
#[derive(Clone, Debug, PartialEq)]
pub enum EntryChange<'a> {
    /// Only in the newer tree.
    Added(&'a TreeEntry),
    /// Only in the older tree.
    Removed(&'a TreeEntry),
    /// In both, pointing at different objects.
    Modified { old: &'a TreeEntry, new: &'a TreeEntry },
}

impl EntryChange<'_> {
    pub fn name(&self) -> &str {
        match self {
            EntryChange::Added(e) | EntryChange::Removed(e) => &e.name,
            EntryChange::Modified { new, .. } => &new.name,
        }
    }
}

/// Classify every name in `old` and `new`, sorted by name.
pub fn diff_entries<'a>(old: &'a Tree, new: &'a Tree) -> Vec<EntryChange<'a>> {
    diff_maps(&old.index(), &new.index())
}

/// Same as [`diff_entries`] over prebuilt `name -> entry` maps.
pub fn diff_maps<'a, K: Ord>(
    old: &BTreeMap<K, &'a TreeEntry>,
    new: &BTreeMap<K, &'a TreeEntry>,
) -> Vec<EntryChange<'a>> {
    let mut changes = Vec::new();
    for (name, &old_entry) in old {
        match new.get(name) {
            Some(&new_entry) if new_entry.id != old_entry.id => changes.push(EntryChange::Modified {
                old: old_entry,
                new: new_entry,
            }),
            Some(_) => {}
            None => changes.push(EntryChange::Removed(old_entry)),
        }
    }
    for (name, &new_entry) in new {
        if !old.contains_key(name) {
            changes.push(EntryChange::Added(new_entry));
        }
    }
    changes.sort_by(|a, b| a.name().cmp(b.name()));
    changes
}
