//! Schema Validator
//!
//! Gates the dataset merge: a load dataset is only absorbed when its schema
//! matches the reference definition class by class and field by field.
//!
//! # Example
//!
//! ```rust,ignore
//! use pi_schema::SchemaValidator;
//!
//! let validator = SchemaValidator::from_definition("schemas/ladm.yaml")?;
//! let report = validator.validate_path("survey/load.json")?;
//! if !report.is_valid() {
//!     for message in report.messages() {
//!         eprintln!("{message}");
//!     }
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod definition;
mod error;
mod validator;

pub use definition::{load_definition, parse_definition, DefinitionFormat};
pub use error::SchemaError;
pub use validator::{SchemaIssue, SchemaValidator, ValidationReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
