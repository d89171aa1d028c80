//! DiskMirror Sync - one-way reconciliation engine
//!
//! Provides:
//! - The polling [`Reconciler`](engine::Reconciler) that keeps a remote folder
//!   identical to a local directory
//! - A bounded batch executor for remote operations
//! - The local directory inventory adapter
//!
//! ## Modules
//!
//! - [`engine`] - Reconciler state machine and cycle orchestration
//! - [`batch`] - Bounded concurrent execution of remote operations
//! - [`inventory`] - Local directory adapter (listing, modification times)

pub mod batch;
pub mod engine;
pub mod inventory;

use diskmirror_core::ports::remote_store::RemoteError;
use thiserror::Error;

/// Conditions that stop the reconciler
///
/// Everything else that can go wrong inside a cycle is logged and retried on
/// the next cycle instead of being returned.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote store rejected the credentials while preparing the folder
    #[error("Remote store rejected credentials: {0}")]
    Unauthorized(#[source] RemoteError),

    /// Settings that cannot drive a reconciler
    #[error("Invalid reconciler settings: {0}")]
    InvalidSettings(String),
}
