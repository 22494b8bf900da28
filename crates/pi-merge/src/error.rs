//! Error types for the merge engine

use pi_data::DataError;
use std::path::PathBuf;

/// Merge failures raised to the caller
///
/// Per-row failures during repair are logged and counted instead.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Storage operation failed
    #[error("data access failed: {0}")]
    Data(#[from] DataError),

    /// Parcel fabric step failed
    #[error("parcel fabric error: {0}")]
    Fabric(String),

    /// Map layer or table not found
    #[error("map element not found: {0}")]
    MapElementNotFound(String),

    /// IO error on a project map file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Project map document could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MergeError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure concerns a whole dataset rather than one class or row
    #[must_use]
    pub fn is_structural(&self) -> bool {
        match self {
            Self::Data(e) => e.is_structural(),
            Self::Fabric(_) | Self::Io { .. } | Self::Serialization(_) => true,
            Self::MapElementNotFound(_) => false,
        }
    }
}
