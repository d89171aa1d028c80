//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for the identifiers the
//! mirror works with. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// FileName
// ============================================================================

/// Name of a file inside the mirrored (flat) folder
///
/// This is the join key between the local and the remote snapshot, so it
/// must identify a single entry of one directory: no path separators, not
/// empty, and neither `.` nor `..`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileName(String);

impl FileName {
    /// Create a new FileName
    ///
    /// # Errors
    /// Returns error if the name is empty, contains a path separator or a
    /// NUL byte, or is one of the special entries `.` / `..`
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();

        if name.is_empty() {
            return Err(DomainError::InvalidFileName(
                "File name cannot be empty".to_string(),
            ));
        }

        if name == "." || name == ".." {
            return Err(DomainError::InvalidFileName(format!(
                "Special directory entry is not a file name: {name}"
            )));
        }

        if name.contains('/') || name.contains('\\') || name.contains('\0') {
            return Err(DomainError::InvalidFileName(format!(
                "File name must not contain separators: {name}"
            )));
        }

        Ok(Self(name))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FileName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FileName> for String {
    fn from(name: FileName) -> Self {
        name.0
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// RemoteFolder
// ============================================================================

/// Path of the cloud folder that receives the mirror
///
/// Accepts either a plain path (`/Mirror`, `Backups/laptop`) or a
/// provider-prefixed one (`disk:/Mirror`). Trailing slashes are stripped so
/// that [`RemoteFolder::child`] never produces a double separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteFolder(String);

impl RemoteFolder {
    /// Create a new RemoteFolder
    ///
    /// # Errors
    /// Returns error if the path is empty (or only slashes) or contains a
    /// `..` traversal component
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();
        let trimmed = path.trim_end_matches('/');

        if trimmed.is_empty() || trimmed.ends_with(':') {
            return Err(DomainError::InvalidRemoteFolder(format!(
                "Remote folder must name a directory below the root: {path:?}"
            )));
        }

        if trimmed.split('/').any(|component| component == "..") {
            return Err(DomainError::InvalidRemoteFolder(format!(
                "Remote folder contains invalid traversal: {path}"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full remote path of a file inside this folder
    #[must_use]
    pub fn child(&self, name: &FileName) -> String {
        format!("{}/{}", self.0, name.as_str())
    }
}

impl Display for RemoteFolder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteFolder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RemoteFolder {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteFolder> for String {
    fn from(folder: RemoteFolder) -> Self {
        folder.0
    }
}
