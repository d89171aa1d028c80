//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. The reconciler depends on these interfaces; the
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - The cloud folder receiving the mirror
//! - [`ILocalInventory`] - The local directory being mirrored

pub mod local_inventory;
pub mod remote_store;

pub use local_inventory::{ILocalInventory, InventoryError};
pub use remote_store::{FolderStatus, IRemoteStore, RemoteError, UploadMode, UploadOutcome};
