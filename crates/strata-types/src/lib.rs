//! Foundation types for Strata.
//!
//! This crate provides the shared data model for the diff engine: content
//! identifiers, entry modes, and the per-path file entries that diff sides
//! exchange. Every other Strata crate depends on `strata-types`.
//!
//! # Key Types
//!
//! - [`ContentId`] -- Content-addressed identifier (BLAKE3 hash)
//! - [`EntryMode`] / [`ModeClass`] -- File mode and its typechange class
//! - [`FileEntry`] -- One path on one diff side (path, mode, id, size)

pub mod content_id;
pub mod entry;
pub mod error;
pub mod mode;

pub use content_id::ContentId;
pub use entry::FileEntry;
pub use error::TypeError;
pub use mode::{EntryMode, ModeClass};
