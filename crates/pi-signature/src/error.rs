//! Error types for signature intake

use pi_consensus::ConsensusError;
use pi_data::DataError;
use std::path::PathBuf;

/// Intake failures
///
/// A declined capture is not an error; see [`crate::IntakeOutcome::Declined`].
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// Storage operation failed
    #[error("data access failed: {0}")]
    Data(#[from] DataError),

    /// Boundary derivation failed
    #[error("consensus failed: {0}")]
    Consensus(#[from] ConsensusError),

    /// Capture program could not be started
    #[error("failed to run capture tool {tool}: {source}")]
    CaptureTool {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error on the signatures folder
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Selection reset failed on a view
    #[error("cannot reset selection on {0}")]
    Selection(String),
}

impl IntakeError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure concerns the environment rather than one row
    #[must_use]
    pub fn is_structural(&self) -> bool {
        match self {
            Self::Data(e) => e.is_structural(),
            Self::Consensus(e) => e.is_structural(),
            Self::CaptureTool { .. } | Self::Io { .. } => true,
            Self::Selection(_) => false,
        }
    }
}
