//! Catalog storage
//!
//! # Modules
//!
//! - [`types`]: Artifact, release, platform version and requirement rows
//! - [`storer`]: Storage trait consumed by the resolution layer
//! - [`store`]: SQLite implementation with a versioned schema
//! - [`snapshot`]: JSON catalog snapshots for bulk import
//! - [`error`]: Storage error types

pub mod error;
pub mod snapshot;
pub mod store;
pub mod storer;
pub mod types;
