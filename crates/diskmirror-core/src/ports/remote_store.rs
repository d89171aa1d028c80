//! Remote store port (driven/secondary port)
//!
//! This module defines the capability the reconciler needs from a cloud
//! storage provider: list a single folder, read modification times, upload,
//! delete, and make sure the folder exists. Everything vendor-specific
//! (authentication header scheme, JSON shapes, upload-URL indirection)
//! stays behind this trait.
//!
//! ## Design Notes
//!
//! - Methods return [`RemoteError`] rather than `anyhow::Error` because the
//!   reconciler's policy depends on the error class: authentication failures
//!   stop the process, transient failures skip a phase, per-file failures
//!   skip a file.
//! - Uses `#[async_trait]` so the reconciler can hold `Arc<dyn IRemoteStore>`.

use thiserror::Error;

use crate::domain::newtypes::FileName;
use crate::domain::snapshot::{FileSet, ModificationIndex};

// ============================================================================
// RemoteError
// ============================================================================

/// Failure classes reported by a remote store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Credentials were rejected; retrying cannot help
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Network or server hiccup affecting a whole request
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The file (local source or remote target) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The file is larger than allowed or the remote storage is full
    #[error("Size limit exceeded: {0}")]
    Size(String),

    /// The server refused or failed a single-file operation
    #[error("Server error: {0}")]
    Server(String),
}

impl RemoteError {
    /// Returns true for authentication failures
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Returns true for failures worth retrying on the next attempt
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

// ============================================================================
// Value types
// ============================================================================

/// Result of [`IRemoteStore::ensure_folder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderStatus {
    /// The folder did not exist and was created
    Created,
    /// The folder was already there
    AlreadyExists,
}

/// Whether an upload may replace an existing remote file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Fail if the remote file already exists
    Create,
    /// Replace the remote file
    Overwrite,
}

impl UploadMode {
    /// Returns true if the server should replace an existing file
    #[must_use]
    pub fn overwrites(self) -> bool {
        matches!(self, Self::Overwrite)
    }
}

/// How the server acknowledged an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The file is stored in the folder
    Stored,
    /// The server took the bytes but has not moved them into the folder yet
    Accepted,
}

// ============================================================================
// IRemoteStore trait
// ============================================================================

/// Port trait for the cloud folder that receives the mirror
///
/// An implementation is bound to one remote folder and to the local
/// directory uploads are read from, so every operation is addressed by
/// [`FileName`] alone.
///
/// ## Implementation Notes
///
/// - Request timeouts are the implementation's business; a timed-out
///   request surfaces as an error of the matching class.
/// - Implementations must be safe to call concurrently for distinct names.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Makes sure the remote folder exists
    ///
    /// # Errors
    /// [`RemoteError::Unauthorized`] when the credentials are rejected,
    /// [`RemoteError::Transient`] for anything else
    async fn ensure_folder(&self) -> Result<FolderStatus, RemoteError>;

    /// Names of the files currently in the remote folder
    ///
    /// # Errors
    /// [`RemoteError::Transient`] if the listing could not be completed; a
    /// partial listing is never returned
    async fn list_files(&self) -> Result<FileSet, RemoteError>;

    /// Modification times of the files currently in the remote folder
    ///
    /// # Errors
    /// [`RemoteError::Transient`] if the listing could not be completed
    async fn modification_times(&self) -> Result<ModificationIndex, RemoteError>;

    /// Uploads the local file `name` into the remote folder
    ///
    /// # Errors
    /// [`RemoteError::NotFound`], [`RemoteError::Size`] or
    /// [`RemoteError::Server`] for this file only
    async fn upload(&self, name: &FileName, mode: UploadMode)
        -> Result<UploadOutcome, RemoteError>;

    /// Deletes `name` from the remote folder
    ///
    /// # Errors
    /// Any [`RemoteError`] describing why this file could not be removed
    async fn delete(&self, name: &FileName) -> Result<(), RemoteError>;
}
