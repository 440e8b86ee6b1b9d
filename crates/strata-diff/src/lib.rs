//! Diff engine for Strata.
//!
//! Builds ordered delta lists between two entry sources and refines them in
//! place: rename and copy detection, rewrite breaking, and whitespace-aware
//! content similarity scoring.
//!
//! # Key Types
//!
//! - [`DiffList`] -- Ordered deltas plus handles for reading entry content
//! - [`Delta`] / [`DeltaStatus`] -- One old/new pairing and its classification
//! - [`DiffOptions`] -- What the list builder records
//! - [`FindOptions`] / [`FindFlags`] -- Similarity pass tuning
//! - [`DiffError`] -- Failure modes

pub mod delta;
pub mod error;
mod find;
pub mod list;
pub mod options;
mod signature;

#[cfg(test)]
pub(crate) mod testutil;

pub use delta::{Delta, DeltaStatus};
pub use error::{DiffError, DiffResult};
pub use list::{DiffList, DiffSide};
pub use options::{DiffOptions, FindFlags, FindOptions, FIND_OPTIONS_VERSION};
