//! Data access contracts
//!
//! Both core components talk to storage only through these traits:
//! - [`DataAccess`]: read/insert/update/delete over named classes
//! - [`SchemaAccess`]: describe and reshape a dataset's schema
//! - [`AttachmentStore`]: bulk-attach files to rows through a match table

use crate::filter::Filter;
use crate::schema::{ClassDef, ClassKind, DatasetSchema, FieldDef};
use crate::value::{ObjectId, Row, Value};
use std::path::PathBuf;

/// Data access errors
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Class does not exist in the dataset
    #[error("class not found: {0}")]
    ClassNotFound(String),

    /// Class already exists
    #[error("class already exists: {0}")]
    ClassExists(String),

    /// Field does not exist in the class
    #[error("field '{field}' not found in {class}")]
    FieldNotFound { class: String, field: String },

    /// Field already exists in the class
    #[error("field '{field}' already exists in {class}")]
    FieldExists { class: String, field: String },

    /// Tuple width differs from the field list
    #[error("value count mismatch in {class}: expected {expected}, got {actual}")]
    ArityMismatch {
        class: String,
        expected: usize,
        actual: usize,
    },

    /// Null written to a non-nullable field
    #[error("field '{field}' in {class} does not accept nulls")]
    NotNullable { class: String, field: String },

    /// Write to a storage-managed field
    #[error("field '{field}' in {class} is read-only")]
    ReadOnlyField { class: String, field: String },

    /// IO error on a dataset file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dataset document could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DataError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors about the dataset itself rather than a single row
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::ClassNotFound(_) | Self::ClassExists(_) | Self::Io { .. } | Self::Serialization(_)
        )
    }
}

/// Generic read/insert/update/delete over named classes
pub trait DataAccess {
    /// Rows of `class` matching `filter`, projected to `fields` (all when `None`)
    fn search(
        &self,
        class: &str,
        fields: Option<&[&str]>,
        filter: Option<&Filter>,
    ) -> Result<Vec<Row>, DataError>;

    /// Insert one row per tuple; returns the assigned object ids in order
    fn insert(
        &mut self,
        class: &str,
        fields: &[&str],
        tuples: Vec<Vec<Value>>,
    ) -> Result<Vec<ObjectId>, DataError>;

    /// Set `fields` to `values` on every row matching `filter`; returns rows touched
    fn update(
        &mut self,
        class: &str,
        fields: &[&str],
        values: &[Value],
        filter: &Filter,
    ) -> Result<usize, DataError>;

    /// Delete rows matching `filter`; returns rows removed
    fn delete(&mut self, class: &str, filter: &Filter) -> Result<usize, DataError>;

    /// Number of rows in `class`
    fn count(&self, class: &str) -> Result<usize, DataError>;

    /// Fully qualified path of `class` inside the dataset
    fn find_table_path(&self, class: &str) -> Result<String, DataError>;
}

/// Schema description and reshaping
pub trait SchemaAccess {
    /// Current schema
    fn schema(&self) -> &DatasetSchema;

    /// Class names of one kind, in schema order
    fn class_names(&self, kind: ClassKind) -> Vec<String> {
        self.schema()
            .classes_of(kind)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Class definition by case-insensitive name
    fn class_def(&self, class: &str) -> Option<&ClassDef> {
        self.schema().class(class)
    }

    /// Create an empty class
    fn create_class(&mut self, def: ClassDef) -> Result<(), DataError>;

    /// Add a field; existing rows receive null
    fn add_field(&mut self, class: &str, field: FieldDef) -> Result<(), DataError>;

    /// Drop a field and its values
    fn delete_field(&mut self, class: &str, field: &str) -> Result<(), DataError>;

    /// Remove every row; returns rows removed
    fn truncate(&mut self, class: &str) -> Result<usize, DataError>;

    /// Replace the whole schema, discarding all data
    fn recreate(&mut self, schema: DatasetSchema) -> Result<(), DataError>;
}

/// A dataset that supports both row and schema operations
pub trait Dataset: DataAccess + SchemaAccess {}

impl<T: DataAccess + SchemaAccess + ?Sized> Dataset for T {}

/// Names of the staged `(key, path)` relation used for bulk attachment
#[derive(Debug, Clone, Copy)]
pub struct MatchSpec<'a> {
    pub table: &'a str,
    pub key_field: &'a str,
    pub value_field: &'a str,
}

/// Bulk attachment of files to rows
pub trait AttachmentStore {
    /// Attach every staged file in `matches` to the `class` row whose `key_field`
    /// equals the staged key; returns attachments written
    fn add_attachments(
        &mut self,
        class: &str,
        key_field: &str,
        matches: &dyn DataAccess,
        spec: &MatchSpec<'_>,
    ) -> Result<usize, DataError>;
}
