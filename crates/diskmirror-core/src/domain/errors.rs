//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! mostly validation failures of identifiers coming from the local
//! filesystem or the remote listing.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A file name that cannot be used as a flat-folder key
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// Invalid remote folder path
    #[error("Invalid remote folder: {0}")]
    InvalidRemoteFolder(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
