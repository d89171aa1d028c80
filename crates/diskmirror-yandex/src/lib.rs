//! DiskMirror Yandex - Yandex Disk REST API adapter
//!
//! Provides:
//! - An authenticated HTTP client for the Yandex Disk REST API
//! - Paginated folder listings with modification times
//! - Two-step uploads (upload link, then `PUT` of the file bytes)
//! - The [`IRemoteStore`](diskmirror_core::ports::IRemoteStore) implementation
//!
//! ## Modules
//!
//! - [`client`] - HTTP client, resource endpoints and 429 handling
//! - [`upload`] - Upload link negotiation and byte transfer
//! - [`provider`] - `YandexRemoteStore`, the remote store port adapter

pub mod client;
pub mod provider;
pub mod upload;

use std::time::Duration;

use diskmirror_core::ports::remote_store::RemoteError;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when communicating with the Yandex Disk API
#[derive(Debug, Error)]
pub enum YandexError {
    /// The OAuth token is missing, invalid, or lacks the required scope
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource already exists (or is locked by another operation)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The file exceeds the maximum size accepted by the service
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// The disk has no room left for the file
    #[error("Insufficient storage: {0}")]
    InsufficientStorage(String),

    /// Rate limit still exceeded after all retries
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration the server asked to wait
        retry_after: Duration,
    },

    /// A server-side error or an unexpected status code
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred (connect, timeout, body read)
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The local file to upload could not be read
    #[error("Cannot read local file {path}: {source}")]
    LocalFile {
        /// File that failed
        path: std::path::PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl YandexError {
    /// Classifies an unsuccessful HTTP status together with its body
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = if body.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {body}")
        };

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(detail),
            StatusCode::NOT_FOUND => Self::NotFound(detail),
            StatusCode::CONFLICT | StatusCode::LOCKED => Self::Conflict(detail),
            StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLarge(detail),
            StatusCode::INSUFFICIENT_STORAGE => Self::InsufficientStorage(detail),
            _ => Self::ServerError(detail),
        }
    }

    /// Maps an error from a folder-level call (listing, folder creation)
    ///
    /// Apart from credential problems everything is worth retrying later.
    pub fn into_folder_error(self) -> RemoteError {
        match self {
            Self::Unauthorized(msg) => RemoteError::Unauthorized(msg),
            other => RemoteError::Transient(other.to_string()),
        }
    }

    /// Maps an error from a single-file transfer
    pub fn into_transfer_error(self) -> RemoteError {
        match self {
            Self::Unauthorized(msg) => RemoteError::Unauthorized(msg),
            Self::NotFound(msg) => RemoteError::NotFound(msg),
            Self::LocalFile { ref source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                RemoteError::NotFound(self.to_string())
            }
            Self::PayloadTooLarge(msg) | Self::InsufficientStorage(msg) => RemoteError::Size(msg),
            other => RemoteError::Server(other.to_string()),
        }
    }
}
