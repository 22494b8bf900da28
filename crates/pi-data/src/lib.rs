//! Public Inspection Data Access Layer
//!
//! Generic read/insert/update/delete over named tabular classes, plus the
//! schema model the merge and validation components reason about.
//!
//! # Core Concepts
//!
//! - [`DataAccess`]: row operations with [`Filter`] predicates
//! - [`SchemaAccess`]: schema description and destructive recreation
//! - [`AttachmentStore`]: bulk file attachment keyed by a match table
//! - [`DatasetSchema`]: classes, fields and relationship classes
//! - [`InMemoryDataset`]: complete implementation persisted as JSON
//!
//! # Example
//!
//! ```rust,ignore
//! use pi_data::{DataAccess, Filter, InMemoryDataset};
//!
//! let mut inspection = InMemoryDataset::load("inspection.json")?;
//! let approvals = inspection.search(
//!     "Approval",
//!     Some(&["GlobalID", "party_fk"]),
//!     Some(&Filter::eq("party_fk", party_id)),
//! )?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod access;
mod filter;
mod memory;
mod schema;
mod value;

pub use access::{AttachmentStore, DataAccess, DataError, Dataset, MatchSpec, SchemaAccess};
pub use filter::Filter;
pub use memory::InMemoryDataset;
pub use schema::{
    attachment_table_name, Cardinality, ClassDef, ClassKind, DatasetSchema, FieldDef, FieldType,
    RelationshipClassDef, ATTACH_DATA_FIELD, ATTACH_NAME_FIELD, ATTACH_REL_FIELD,
    GEOMETRY_SYSTEM_FIELDS, GLOBAL_ID_FIELD, OBJECT_ID_FIELD, SHAPE_FIELD,
};
pub use value::{Envelope, ObjectId, Row, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
