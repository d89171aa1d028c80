//! Domain entities and business logic
//!
//! This module contains the core domain types for DiskMirror:
//! - Newtypes for validated file names and remote folder paths
//! - Snapshots of one side of the mirror (names and modification times)
//! - The per-cycle operation set derived from two snapshots
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod plan;
pub mod snapshot;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::{FileName, RemoteFolder};
pub use plan::{Operation, OperationSet};
pub use snapshot::{truncate_to_seconds, FileSet, ModificationIndex};
