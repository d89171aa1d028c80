//! DiskMirror Core - Domain logic and ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `FileName`, `RemoteFolder`, `ModificationIndex`, `OperationSet`
//! - **Port definitions** - Traits for adapters: `IRemoteStore`, `ILocalInventory`
//! - **Configuration** - YAML-backed settings with validation and env overrides
//!
//! # Architecture
//!
//! The domain module is pure: it computes what has to change between a local
//! snapshot and a remote snapshot without performing any I/O. Ports define
//! the trait interfaces that the sync engine drives and that adapter crates
//! implement.

pub mod config;
pub mod domain;
pub mod ports;
