//! Approval Consensus Engine
//!
//! Derives the aggregate state of every boundary under public inspection from
//! the approvals its parties have signed.
//!
//! # Core Concepts
//!
//! - [`ApprovalState`]: one party's decision on one boundary
//! - [`BoundaryState`]: aggregate state derived by [`derive_state`]
//! - [`ConsensusEngine`]: applies decisions and persists derived states
//! - [`InspectionModel`]: class and field names the engine reads and writes
//!
//! # Example
//!
//! ```rust,ignore
//! use pi_consensus::{ConsensusEngine, InspectionModel, NeighborDecision};
//!
//! let engine = ConsensusEngine::new(InspectionModel::default());
//! engine.record_approval_decisions(&mut inspection, &approvals, &decisions);
//! let report = engine.derive_boundary_states(&mut inspection, &approvals)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod engine;
mod error;
mod model;

pub use engine::{
    derive_state, resolve_decision, BoundaryOutcome, BoundaryReport, ConsensusEngine,
    DecisionReport,
};
pub use error::ConsensusError;
pub use model::{
    ApprovalNames, ApprovalRef, ApprovalSignatureNames, ApprovalState, BoundaryNames,
    BoundaryState, InspectionModel, NeighborDecision, PartyNames, SpatialUnitNames, UnknownState,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
