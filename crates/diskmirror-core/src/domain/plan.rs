//! Per-cycle operation planning
//!
//! Derives the three operation sets that bring the remote folder in line
//! with the local folder. Planning is pure: it only looks at snapshots and
//! never talks to either side.
//!
//! - **to_upload**: `local ∖ remote`
//! - **to_delete**: `remote ∖ local`
//! - **to_overwrite**: files on both sides whose local timestamp is strictly
//!   newer than the remote one
//!
//! `to_upload` and `to_delete` are set differences in opposite directions, so
//! they never share a name.

use std::fmt;

use super::newtypes::FileName;
use super::snapshot::{FileSet, ModificationIndex};

// ============================================================================
// Operation
// ============================================================================

/// A single remote mutation scheduled by the reconciler
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a file that only exists locally (no server-side overwrite)
    Upload(FileName),
    /// Remove a file that no longer exists locally
    Delete(FileName),
    /// Replace a remote file with a newer local version
    Overwrite(FileName),
}

impl Operation {
    /// File the operation acts on
    #[must_use]
    pub fn file_name(&self) -> &FileName {
        match self {
            Self::Upload(name) | Self::Delete(name) | Self::Overwrite(name) => name,
        }
    }

    /// Short lowercase label used in log fields
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upload(_) => "upload",
            Self::Delete(_) => "delete",
            Self::Overwrite(_) => "overwrite",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.file_name())
    }
}

// ============================================================================
// OperationSet
// ============================================================================

/// The operations one reconciliation cycle has to perform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSet {
    to_upload: FileSet,
    to_delete: FileSet,
    to_overwrite: FileSet,
}

impl OperationSet {
    /// Computes uploads and deletes from the two name listings
    ///
    /// The overwrite set starts empty; it depends on modification times that
    /// are only read after the uploads and deletes have settled, see
    /// [`OperationSet::plan_overwrites`].
    #[must_use]
    pub fn from_listings(local: &FileSet, remote: &FileSet) -> Self {
        Self {
            to_upload: local.difference(remote).cloned().collect(),
            to_delete: remote.difference(local).cloned().collect(),
            to_overwrite: FileSet::new(),
        }
    }

    /// Fills the overwrite set from both sides' modification times
    pub fn plan_overwrites(&mut self, local: &ModificationIndex, remote: &ModificationIndex) {
        self.to_overwrite = Self::stale_files(local, remote);
    }

    /// Files known to both indexes whose local timestamp is strictly newer
    ///
    /// Equal timestamps are treated as in sync, which keeps repeated cycles
    /// over an unchanged folder from re-uploading anything.
    #[must_use]
    pub fn stale_files(local: &ModificationIndex, remote: &ModificationIndex) -> FileSet {
        local
            .iter()
            .filter_map(|(name, local_modified)| match remote.get(name) {
                Some(remote_modified) if *local_modified > remote_modified => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Files that exist only locally
    #[must_use]
    pub fn to_upload(&self) -> &FileSet {
        &self.to_upload
    }

    /// Files that exist only remotely
    #[must_use]
    pub fn to_delete(&self) -> &FileSet {
        &self.to_delete
    }

    /// Files whose local copy is newer than the remote one
    #[must_use]
    pub fn to_overwrite(&self) -> &FileSet {
        &self.to_overwrite
    }

    /// Uploads followed by deletes, ready to be dispatched as one batch
    #[must_use]
    pub fn transfer_operations(&self) -> Vec<Operation> {
        self.to_upload
            .iter()
            .cloned()
            .map(Operation::Upload)
            .chain(self.to_delete.iter().cloned().map(Operation::Delete))
            .collect()
    }

    /// Overwrite operations
    #[must_use]
    pub fn overwrite_operations(&self) -> Vec<Operation> {
        self.to_overwrite
            .iter()
            .cloned()
            .map(Operation::Overwrite)
            .collect()
    }

    /// Total number of planned operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_upload.len() + self.to_delete.len() + self.to_overwrite.len()
    }

    /// Whether the cycle has nothing to do
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
