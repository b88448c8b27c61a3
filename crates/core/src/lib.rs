#![warn(clippy::all, missing_docs)]

//! Core domain logic for the mod catalog.
//!
//! This crate hosts the catalog records, configuration handling, local
//! cache persistence, remote manifest synchronisation and dependency
//! resolution used by the command-line front end and any future frontends.

pub mod catalog;
pub mod config;
pub mod models;
pub mod remote;
pub mod store;
pub mod update;
pub mod version;

pub use catalog::{
    Catalog, CatalogSynchronizer, DependencyResolver, SortKey, SyncError, SyncEvent,
};
pub use config::AppConfig;
pub use models::{CatalogRecord, ReleaseInfo, RemoteModIdentity};
pub use store::{CatalogStore, FsPersistence, Persistence, StoreError};
pub use version::VersionTriple;
