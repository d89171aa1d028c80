//! YandexRemoteStore - IRemoteStore implementation for the Yandex Disk API
//!
//! Wraps the [`DiskClient`] and delegates to the client and upload modules to
//! fulfil the [`IRemoteStore`] port contract for one remote folder.
//!
//! ## Design Notes
//!
//! - The store knows the local root so `upload` can read file bytes by name.
//! - Only entries of type `file` are reported; sub-folders of the remote
//!   folder are left alone.
//! - Folder-level failures surface as `Transient`, single-file failures as
//!   `NotFound` / `Size` / `Server` (see [`YandexError`]).

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use diskmirror_core::config::Config;
use diskmirror_core::domain::newtypes::{FileName, RemoteFolder};
use diskmirror_core::domain::snapshot::{FileSet, ModificationIndex};
use diskmirror_core::ports::remote_store::{
    FolderStatus, IRemoteStore, RemoteError, UploadMode, UploadOutcome,
};
use tracing::{debug, instrument, warn};

use crate::client::{DiskClient, RemoteEntry};
use crate::upload;
use crate::YandexError;

/// Default number of entries requested per listing page
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Remote store backed by one Yandex Disk folder
#[derive(Debug, Clone)]
pub struct YandexRemoteStore {
    client: DiskClient,
    folder: RemoteFolder,
    local_root: PathBuf,
    page_size: u32,
}

impl YandexRemoteStore {
    /// Creates a store mirroring `local_root` into `folder`
    pub fn new(client: DiskClient, folder: RemoteFolder, local_root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            folder,
            local_root: local_root.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Overrides the listing page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Builds a store from the application configuration
    ///
    /// # Errors
    /// Returns an error if the token is missing, the cloud folder is invalid
    /// or the HTTP client cannot be created
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let token = config
            .remote
            .token
            .as_deref()
            .context("No OAuth token configured (remote.token or DISKMIRROR_TOKEN)")?;
        let folder = RemoteFolder::new(config.remote.cloud_folder.clone())
            .context("Invalid remote.cloud_folder")?;
        let client = DiskClient::with_timeout(
            token,
            config.remote.base_url.clone(),
            std::time::Duration::from_secs(config.remote.request_timeout),
        )
        .context("Failed to create Yandex Disk client")?;

        Ok(Self::new(client, folder, config.resolved_local_folder())
            .with_page_size(config.remote.page_size))
    }

    /// The remote folder receiving the mirror
    pub fn folder(&self) -> &RemoteFolder {
        &self.folder
    }

    /// The local directory uploads are read from
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    /// Lists the folder and keeps only file entries with valid names
    async fn list_entries(&self) -> Result<Vec<(FileName, RemoteEntry)>, RemoteError> {
        let entries = self
            .client
            .list_folder(self.folder.as_str(), self.page_size)
            .await
            .map_err(YandexError::into_folder_error)?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.is_file)
            .filter_map(|entry| match FileName::new(entry.name.clone()) {
                Ok(name) => Some((name, entry)),
                Err(err) => {
                    warn!(name = %entry.name, error = %err, "Skipping remote entry with invalid name");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl IRemoteStore for YandexRemoteStore {
    #[instrument(skip(self), fields(folder = %self.folder))]
    async fn ensure_folder(&self) -> Result<FolderStatus, RemoteError> {
        self.client
            .create_folder(self.folder.as_str())
            .await
            .map_err(YandexError::into_folder_error)
    }

    #[instrument(skip(self), fields(folder = %self.folder))]
    async fn list_files(&self) -> Result<FileSet, RemoteError> {
        let files: FileSet = self
            .list_entries()
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        debug!(files = files.len(), "Listed remote folder");
        Ok(files)
    }

    #[instrument(skip(self), fields(folder = %self.folder))]
    async fn modification_times(&self) -> Result<ModificationIndex, RemoteError> {
        let mut index = ModificationIndex::new();
        for (name, entry) in self.list_entries().await? {
            match entry.modified {
                Some(modified) => index.insert(name, modified),
                None => {
                    return Err(RemoteError::Transient(format!(
                        "listing has no modification time for {name}"
                    )))
                }
            }
        }
        Ok(index)
    }

    #[instrument(skip(self), fields(folder = %self.folder, file = %name))]
    async fn upload(&self, name: &FileName, mode: UploadMode) -> Result<UploadOutcome, RemoteError> {
        let local_path = self.local_root.join(name.as_str());
        upload::upload_file(&self.client, &local_path, &self.folder.child(name), mode)
            .await
            .map_err(YandexError::into_transfer_error)
    }

    #[instrument(skip(self), fields(folder = %self.folder, file = %name))]
    async fn delete(&self, name: &FileName) -> Result<(), RemoteError> {
        let existed = self
            .client
            .delete_resource(&self.folder.child(name))
            .await
            .map_err(YandexError::into_folder_error)?;
        if !existed {
            debug!("Remote file was already gone");
        }
        Ok(())
    }
}
