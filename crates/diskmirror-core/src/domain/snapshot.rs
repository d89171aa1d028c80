//! Snapshots of one side of the mirror
//!
//! A snapshot is captured once per cycle and never mutated afterwards: the
//! set of file names present on a side, and optionally the modification
//! time of each of those files.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;

use chrono::{DateTime, SubsecRound, Utc};

use super::newtypes::FileName;

/// Set of file names present on one side of the mirror at one instant
///
/// A `BTreeSet` keeps iteration (and therefore log output and dispatch
/// order) deterministic.
pub type FileSet = BTreeSet<FileName>;

/// Truncates a timestamp to whole seconds
///
/// Both sides are compared at second resolution: local filesystems report
/// nanoseconds while the remote API reports seconds, and comparing at
/// different precisions would flag every file as modified.
#[must_use]
pub fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(0)
}

// ============================================================================
// ModificationIndex
// ============================================================================

/// Mapping of file name to last-modified time (UTC, second resolution)
///
/// Holds exactly one entry per file known to the side it was read from.
/// Timestamps are truncated on insertion so callers can't accidentally
/// compare sub-second values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModificationIndex {
    entries: BTreeMap<FileName, DateTime<Utc>>,
}

impl ModificationIndex {
    /// Creates an empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the modification time of `name`, replacing any earlier entry
    pub fn insert(&mut self, name: FileName, modified: DateTime<Utc>) {
        self.entries.insert(name, truncate_to_seconds(modified));
    }

    /// Modification time of `name`, if this side knows the file
    #[must_use]
    pub fn get(&self, name: &FileName) -> Option<DateTime<Utc>> {
        self.entries.get(name).copied()
    }

    /// Whether the index has an entry for `name`
    #[must_use]
    pub fn contains(&self, name: &FileName) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of files in the index
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names covered by the index
    #[must_use]
    pub fn names(&self) -> FileSet {
        self.entries.keys().cloned().collect()
    }

    /// Iterates over `(name, modified)` pairs in name order
    pub fn iter(&self) -> btree_map::Iter<'_, FileName, DateTime<Utc>> {
        self.entries.iter()
    }
}

impl FromIterator<(FileName, DateTime<Utc>)> for ModificationIndex {
    fn from_iter<I: IntoIterator<Item = (FileName, DateTime<Utc>)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (name, modified) in iter {
            index.insert(name, modified);
        }
        index
    }
}

impl<'a> IntoIterator for &'a ModificationIndex {
    type Item = (&'a FileName, &'a DateTime<Utc>);
    type IntoIter = btree_map::Iter<'a, FileName, DateTime<Utc>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
