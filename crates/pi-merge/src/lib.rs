//! Dataset Merge Engine
//!
//! Absorbs a validated load dataset into the inspection dataset while keeping
//! every foreign key that linked its rows.
//!
//! # Core Concepts
//!
//! - [`MergeEngine`]: append, relationship repair, and cleanup
//! - [`IdentityMap`]: load identity to inspection identity, held only for the
//!   duration of a merge
//! - [`FieldMap`]: per-class field correspondence used by append
//! - [`ParcelFabric`]: record derivation and fabric build after the merge
//! - [`MapDocument`]: inspection map refresh
//!
//! # Example
//!
//! ```rust,ignore
//! use pi_merge::{snapshot_survey, MergeEngine};
//!
//! snapshot_survey(&load, &mut survey)?;
//! let report = MergeEngine::default().merge_into(&load, &mut inspection, Some(&parcel_schema))?;
//! assert!(report.failed_classes.is_empty());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod engine;
mod error;
mod fabric;
mod field_map;
mod identity;
mod presentation;
mod survey;

pub use engine::{
    AppendOutcome, AppendStatus, CleanupReport, MergeEngine, MergeReport, RepairReport,
    RepairedRelationship, DEFAULT_PERMANENT_MARKER,
};
pub use error::MergeError;
pub use fabric::{
    FabricSummary, ParcelFabric, RecordFabric, CREATED_BY_RECORD_FIELD, RECORDS_CLASS,
    RECORD_NAME_FIELD, RETIRED_BY_RECORD_FIELD,
};
pub use field_map::{FieldMap, FieldMapping};
pub use identity::{correlation_field_name, IdentityMap};
pub use presentation::{
    clean_inspection_map, expand_extent, refresh_inspection_map, MapDocument, MapLayer,
    MapSettings, MapSummary, MapTable, ProjectMap, EXTENT_EXPANSION,
};
pub use survey::snapshot_survey;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
