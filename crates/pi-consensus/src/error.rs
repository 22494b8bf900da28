//! Error types for the consensus engine

use pi_data::DataError;

/// Failures that abort a consensus operation
///
/// Per-row write failures never surface here; they are logged and counted in
/// the operation report.
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    /// Approvals or boundaries could not be read
    #[error("data access failed: {0}")]
    Data(#[from] DataError),
}

impl ConsensusError {
    /// Whether the dataset itself is unusable
    #[must_use]
    pub fn is_structural(&self) -> bool {
        match self {
            Self::Data(e) => e.is_structural(),
        }
    }
}
