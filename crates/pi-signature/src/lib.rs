//! Signature Intake Workflow
//!
//! Turns a party's signature at the inspection desk into attached evidence on
//! each of the party's approvals and an updated state for every boundary the
//! party signed for.
//!
//! # Core Concepts
//!
//! - [`SignatureIntake`]: the capture, attach and consensus pipeline
//! - [`IntakeRequest`]: spatial unit, party and neighbor decisions of one intake
//! - [`SignatureCapture`]: blocking capture capability, backed by an external
//!   program in [`ProcessSignatureCapture`]
//! - [`MatchTable`]: reusable scratch relation keyed for bulk attachment
//! - [`InspectionQueries`]: lookups that assemble a request
//!
//! # Example
//!
//! ```rust,ignore
//! use pi_signature::{IntakeRequest, ProcessSignatureCapture, SignatureIntake};
//!
//! let capture = ProcessSignatureCapture::new(tool, "-f", "-n", signatures_dir);
//! let mut intake = SignatureIntake::new(model, capture);
//! let unit = intake.queries().spatial_unit_by_legal_id(&inspection, "LEGAL-001")?;
//! let outcome = intake.capture_and_attach(&mut inspection, &mut scratch, &request)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod capture;
mod error;
mod intake;
mod match_table;
mod queries;

pub use capture::{
    fingerprint_file_name, signature_file_name, CapturedImages, ProcessSignatureCapture,
    SignatureCapture,
};
pub use error::IntakeError;
pub use intake::{IntakeOutcome, IntakeRequest, SelectionView, SignatureIntake};
pub use match_table::{MatchTable, MATCH_FIELD, MATCH_TABLE_NAME, PICTURE_FIELD};
pub use queries::{apply_table_decisions, InspectionQueries, NeighborApproval, Party, SpatialUnit};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
