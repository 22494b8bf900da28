//! Top-level error type

use crate::config::ConfigError;
use pi_consensus::ConsensusError;
use pi_data::DataError;
use pi_merge::MergeError;
use pi_schema::SchemaError;
use pi_signature::IntakeError;

/// Failures surfaced by the tools
#[derive(Debug, thiserror::Error)]
pub enum PiError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("data access error: {0}")]
    Data(#[from] DataError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("signature intake error: {0}")]
    Intake(#[from] IntakeError),

    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),
}

impl PiError {
    /// Whether the failure concerns a whole dataset or the environment
    #[must_use]
    pub fn is_structural(&self) -> bool {
        match self {
            Self::Config(_) | Self::Schema(_) => true,
            Self::Data(e) => e.is_structural(),
            Self::Merge(e) => e.is_structural(),
            Self::Intake(e) => e.is_structural(),
            Self::Consensus(e) => e.is_structural(),
        }
    }
}

/// Result alias for the tools
pub type Result<T> = std::result::Result<T, PiError>;
