//! Local directory adapter (secondary/driven adapter)
//!
//! Implements [`ILocalInventory`] using `tokio::fs`. The tracked directory is
//! flat: sub-directories are ignored and nothing below them is visited.
//! Entries whose names are not valid UTF-8 cannot be addressed remotely and
//! are skipped.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diskmirror_core::domain::newtypes::FileName;
use diskmirror_core::domain::snapshot::{FileSet, ModificationIndex};
use diskmirror_core::ports::local_inventory::{ILocalInventory, InventoryError};
use tracing::{debug, instrument, warn};

/// Adapter that reads the tracked directory from the real filesystem
#[derive(Debug, Clone)]
pub struct DirectoryInventory {
    root: PathBuf,
}

impl DirectoryInventory {
    /// Create an inventory over `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn unreadable(&self, source: std::io::Error) -> InventoryError {
        InventoryError::Unreadable {
            path: self.root.clone(),
            source,
        }
    }
}

/// Converts a filesystem timestamp to UTC with whole-second resolution
fn to_utc_seconds(time: std::time::SystemTime) -> Option<DateTime<Utc>> {
    let since_epoch = time.duration_since(std::time::UNIX_EPOCH).ok()?;
    DateTime::from_timestamp(since_epoch.as_secs() as i64, 0)
}

#[async_trait]
impl ILocalInventory for DirectoryInventory {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn list_files(&self) -> Result<FileSet, InventoryError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| self.unreadable(e))?;

        let mut files = FileSet::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| self.unreadable(e))? {
            let raw_name = entry.file_name();
            let Some(name) = raw_name.to_str() else {
                warn!(name = ?raw_name, "Skipping entry with non UTF-8 name");
                continue;
            };

            let file_name = match FileName::new(name) {
                Ok(file_name) => file_name,
                Err(err) => {
                    warn!(name, error = %err, "Skipping entry with invalid name");
                    continue;
                }
            };

            // Follows symlinks so a link to a regular file is mirrored as a file.
            // An entry that exists but cannot be inspected fails the listing.
            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!(name, "Entry vanished while listing");
                    continue;
                }
                Err(source) => {
                    return Err(InventoryError::Io {
                        name: file_name,
                        source,
                    })
                }
            };
            if !metadata.is_file() {
                debug!(name, "Skipping non-file entry");
                continue;
            }

            files.insert(file_name);
        }

        debug!(files = files.len(), "Listed local directory");
        Ok(files)
    }

    #[instrument(skip(self, names), fields(root = %self.root.display(), files = names.len()))]
    async fn modification_times(
        &self,
        names: &FileSet,
    ) -> Result<ModificationIndex, InventoryError> {
        let mut index = ModificationIndex::new();

        for name in names {
            let path = self.root.join(name.as_str());
            let metadata = tokio::fs::metadata(&path).await.map_err(|source| {
                if source.kind() == ErrorKind::NotFound {
                    InventoryError::Vanished(name.clone())
                } else {
                    InventoryError::Io {
                        name: name.clone(),
                        source,
                    }
                }
            })?;

            let modified = metadata
                .modified()
                .map_err(|source| InventoryError::Io {
                    name: name.clone(),
                    source,
                })?;
            let modified = to_utc_seconds(modified).ok_or_else(|| InventoryError::Io {
                name: name.clone(),
                source: std::io::Error::new(
                    ErrorKind::InvalidData,
                    "modification time before the Unix epoch",
                ),
            })?;

            index.insert(name.clone(), modified);
        }

        Ok(index)
    }
}
