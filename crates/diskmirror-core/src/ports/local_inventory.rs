//! Local inventory port (driven/secondary port)
//!
//! This module defines how the reconciler reads the local side of the
//! mirror: the set of file names in the tracked directory and their
//! modification times. Both reads happen at call time; nothing is cached.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::newtypes::FileName;
use crate::domain::snapshot::{FileSet, ModificationIndex};

/// Errors raised while reading the local directory
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The tracked directory itself could not be read
    #[error("Cannot read directory {path}: {source}")]
    Unreadable {
        /// Directory that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A file disappeared between listing and reading its metadata
    #[error("File vanished before its metadata was read: {0}")]
    Vanished(FileName),

    /// Any other I/O failure on a single entry
    #[error("IO error on {name}: {source}")]
    Io {
        /// Entry that failed
        name: FileName,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Port trait for the local directory being mirrored
///
/// The directory is flat: only its direct entries are considered.
#[async_trait::async_trait]
pub trait ILocalInventory: Send + Sync {
    /// Names of the files currently in the tracked directory
    ///
    /// # Errors
    /// [`InventoryError::Unreadable`] if the directory cannot be listed,
    /// [`InventoryError::Io`] if an existing entry cannot be inspected
    async fn list_files(&self) -> Result<FileSet, InventoryError>;

    /// Modification time of each of `names`, read now
    ///
    /// Never drops a requested name: the result either covers every name or
    /// the call fails.
    ///
    /// # Errors
    /// [`InventoryError::Vanished`] if one of the files no longer exists
    async fn modification_times(&self, names: &FileSet)
        -> Result<ModificationIndex, InventoryError>;
}
