//! Error types for schema loading and validation

use pi_data::DataError;
use std::path::PathBuf;

/// Failures that prevent a validation from running
///
/// A candidate that does not match the reference is not an error; it yields
/// an invalid [`ValidationReport`](crate::ValidationReport).
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Candidate dataset path does not exist
    #[error("load data source does not exist: {0}")]
    SourceMissing(PathBuf),

    /// Definition file extension is not JSON or YAML
    #[error("unknown schema definition format: {0}")]
    UnknownFormat(PathBuf),

    /// Definition is syntactically valid but inconsistent
    #[error("invalid schema definition: {0}")]
    InvalidDefinition(String),

    /// IO error reading a definition
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Candidate dataset could not be opened
    #[error("data access failed: {0}")]
    Data(#[from] DataError),
}

impl SchemaError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
