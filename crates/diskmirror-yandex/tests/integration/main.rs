//! Integration tests for diskmirror-yandex
//!
//! Uses wiremock to simulate the Yandex Disk REST API and verifies
//! end-to-end behavior of the DiskClient, folder listings, uploads,
//! deletes and the IRemoteStore adapter.

mod common;

mod test_folder;
mod test_listing;
mod test_transfers;
