//! Load-dataset schema validation
//!
//! Compares a candidate dataset against a reference schema and collects
//! every difference. Validation never stops at the first issue.

use crate::definition::load_definition;
use crate::error::SchemaError;
use pi_data::{ClassDef, ClassKind, DatasetSchema, FieldDef, FieldType, InMemoryDataset, SchemaAccess};
use std::path::Path;

fn show<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "none".to_string(), ToString::to_string)
}

/// A single schema difference
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaIssue {
    #[error("missing class {class}")]
    MissingClass { class: String },

    #[error("missing field {field} in {class}")]
    MissingField { class: String, field: String },

    #[error("field {field} in {class} has different type: expected {expected}, found {actual}")]
    TypeMismatch {
        class: String,
        field: String,
        expected: FieldType,
        actual: FieldType,
    },

    #[error("field {field} in {class} has different length: expected {}, found {}", show(.expected.as_ref()), show(.actual.as_ref()))]
    LengthMismatch {
        class: String,
        field: String,
        expected: Option<u32>,
        actual: Option<u32>,
    },

    #[error("field {field} in {class} has different nullable: expected {expected}, found {actual}")]
    NullableMismatch {
        class: String,
        field: String,
        expected: bool,
        actual: bool,
    },

    #[error("field {field} in {class} has different domain: expected {}, found {}", show(.expected.as_ref()), show(.actual.as_ref()))]
    DomainMismatch {
        class: String,
        field: String,
        expected: Option<String>,
        actual: Option<String>,
    },
}

/// Outcome of a validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Differences in reference order: feature classes, then tables, each
    /// field in definition order
    pub issues: Vec<SchemaIssue>,
}

impl ValidationReport {
    /// Valid exactly when no issue was found
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issue messages in order
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Validates candidate datasets against a reference schema
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    reference: DatasetSchema,
}

impl SchemaValidator {
    #[inline]
    #[must_use]
    pub fn new(reference: DatasetSchema) -> Self {
        Self { reference }
    }

    /// Build the reference schema from a definition file
    ///
    /// # Errors
    /// Returns error if the definition cannot be loaded
    pub fn from_definition(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        Ok(Self::new(load_definition(path)?))
    }

    #[inline]
    #[must_use]
    pub fn reference(&self) -> &DatasetSchema {
        &self.reference
    }

    /// Compare `candidate` with the reference schema
    pub fn validate<S: SchemaAccess + ?Sized>(&self, candidate: &S) -> ValidationReport {
        let candidate = candidate.schema();
        let mut report = ValidationReport::default();

        let reference_classes = self
            .reference
            .classes_of(ClassKind::FeatureClass)
            .chain(self.reference.classes_of(ClassKind::Table));
        for expected in reference_classes {
            match candidate.class(&expected.name) {
                None => report.issues.push(SchemaIssue::MissingClass {
                    class: expected.name.clone(),
                }),
                Some(actual) => compare_class(expected, actual, &mut report.issues),
            }
        }

        if report.is_valid() {
            tracing::info!(dataset = %candidate.name, "schema validation passed");
        } else {
            tracing::warn!(
                dataset = %candidate.name,
                issues = report.issues.len(),
                "schema validation failed"
            );
        }
        report
    }

    /// Open the dataset document at `path` and validate it
    ///
    /// # Errors
    /// Returns error if the path does not exist or is not a dataset document
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<ValidationReport, SchemaError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchemaError::SourceMissing(path.to_path_buf()));
        }
        let candidate = InMemoryDataset::load(path)?;
        Ok(self.validate(&candidate))
    }
}

fn compare_class(expected: &ClassDef, actual: &ClassDef, issues: &mut Vec<SchemaIssue>) {
    for field in &expected.fields {
        match actual.field(&field.name) {
            None => issues.push(SchemaIssue::MissingField {
                class: expected.name.clone(),
                field: field.name.clone(),
            }),
            Some(found) => compare_field(&expected.name, field, found, issues),
        }
    }
}

fn compare_field(class: &str, expected: &FieldDef, actual: &FieldDef, issues: &mut Vec<SchemaIssue>) {
    let class = class.to_string();
    let field = expected.name.clone();
    if expected.field_type != actual.field_type {
        issues.push(SchemaIssue::TypeMismatch {
            class: class.clone(),
            field: field.clone(),
            expected: expected.field_type,
            actual: actual.field_type,
        });
    }
    if expected.length != actual.length {
        issues.push(SchemaIssue::LengthMismatch {
            class: class.clone(),
            field: field.clone(),
            expected: expected.length,
            actual: actual.length,
        });
    }
    if expected.nullable != actual.nullable {
        issues.push(SchemaIssue::NullableMismatch {
            class: class.clone(),
            field: field.clone(),
            expected: expected.nullable,
            actual: actual.nullable,
        });
    }
    if expected.domain != actual.domain {
        issues.push(SchemaIssue::DomainMismatch {
            class,
            field,
            expected: expected.domain.clone(),
            actual: actual.domain.clone(),
        });
    }
}
