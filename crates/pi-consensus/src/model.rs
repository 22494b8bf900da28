//! Inspection domain model
//!
//! Approval and boundary states, the records the engine consumes, and the
//! class/field names of the inspection dataset.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// One party's decision on one boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApprovalState {
    #[default]
    #[serde(rename = "No Processed")]
    NoProcessed,
    Yes,
    No,
}

impl ApprovalState {
    /// Stored text
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoProcessed => "No Processed",
            Self::Yes => "Yes",
            Self::No => "No",
        }
    }
}

impl std::fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ApprovalState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "No Processed" => Ok(Self::NoProcessed),
            "Yes" => Ok(Self::Yes),
            "No" => Ok(Self::No),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// Aggregate state of a boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoundaryState {
    #[default]
    #[serde(rename = "No Processed")]
    NoProcessed,
    #[serde(rename = "In Process")]
    InProcess,
    Approved,
    Rejected,
}

impl BoundaryState {
    /// Stored text
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoProcessed => "No Processed",
            Self::InProcess => "In Process",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for BoundaryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BoundaryState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "No Processed" => Ok(Self::NoProcessed),
            "In Process" => Ok(Self::InProcess),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// State text outside the fixed enumerations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown state: '{0}'")]
pub struct UnknownState(pub String);

/// Approval touched by the current action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalRef {
    pub id: Uuid,
    pub party_fk: Uuid,
    pub boundary_fk: Uuid,
}

/// Explicit operator decision for one approval in the current transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborDecision {
    /// Approval this decision applies to
    pub approval_id: Uuid,
    pub is_approved: ApprovalState,
}

impl NeighborDecision {
    #[inline]
    #[must_use]
    pub fn new(approval_id: Uuid, is_approved: ApprovalState) -> Self {
        Self {
            approval_id,
            is_approved,
        }
    }
}

/// Spatial unit class naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialUnitNames {
    pub class: String,
    pub id: String,
    pub legal_id: String,
}

/// Party class naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyNames {
    pub class: String,
    pub id: String,
    pub name: String,
    pub spatial_unit_fk: String,
}

/// Boundary class naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryNames {
    pub class: String,
    pub id: String,
    pub spatial_unit_fk: String,
    pub state: String,
    /// Human-readable neighbor label shown to the operator
    pub neighbors: String,
}

/// Approval class naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalNames {
    pub class: String,
    pub id: String,
    pub party_fk: String,
    pub boundary_fk: String,
    pub is_approved: String,
    pub date: String,
}

/// Approval signature class naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSignatureNames {
    pub class: String,
    pub id: String,
    pub approval_fk: String,
}

/// Class and field names of the inspection dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionModel {
    pub spatial_unit: SpatialUnitNames,
    pub party: PartyNames,
    pub boundary: BoundaryNames,
    pub approval: ApprovalNames,
    pub approval_signature: ApprovalSignatureNames,
}

impl Default for InspectionModel {
    fn default() -> Self {
        Self {
            spatial_unit: SpatialUnitNames {
                class: "SpatialUnit".into(),
                id: "GlobalID".into(),
                legal_id: "legal_id".into(),
            },
            party: PartyNames {
                class: "Party".into(),
                id: "GlobalID".into(),
                name: "name".into(),
                spatial_unit_fk: "spatialunit_fk".into(),
            },
            boundary: BoundaryNames {
                class: "Boundary".into(),
                id: "GlobalID".into(),
                spatial_unit_fk: "spatialunit_fk".into(),
                state: "state".into(),
                neighbors: "neighbors".into(),
            },
            approval: ApprovalNames {
                class: "PublicInspection_Approval".into(),
                id: "GlobalID".into(),
                party_fk: "party_fk".into(),
                boundary_fk: "boundary_fk".into(),
                is_approved: "is_approved".into(),
                date: "approval_date".into(),
            },
            approval_signature: ApprovalSignatureNames {
                class: "PublicInspection_ApprovalSignature".into(),
                id: "GlobalID".into(),
                approval_fk: "approval_fk".into(),
            },
        }
    }
}
