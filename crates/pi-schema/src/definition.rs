//! Reference schema definitions
//!
//! A definition is a [`DatasetSchema`] document written as JSON or YAML:
//!
//! ```yaml
//! name: ladm
//! classes:
//!   - name: SpatialUnit
//!     kind: FeatureClass
//!     fields:
//!       - { name: legal_id, type: String, length: 50, nullable: false }
//! relationships: []
//! ```

use crate::error::SchemaError;
use pi_data::DatasetSchema;
use std::path::Path;

/// Definition document syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Json,
    Yaml,
}

impl DefinitionFormat {
    /// Format implied by a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Parse a definition document
///
/// # Errors
/// Returns error if the text is not a schema document in `format`
pub fn parse_definition(text: &str, format: DefinitionFormat) -> Result<DatasetSchema, SchemaError> {
    let schema: DatasetSchema = match format {
        DefinitionFormat::Json => serde_json::from_str(text)?,
        DefinitionFormat::Yaml => serde_yaml::from_str(text)?,
    };
    check_definition(&schema)?;
    Ok(schema)
}

/// Load a definition file, choosing the syntax from its extension
///
/// # Errors
/// Returns error if the file is unreadable, has an unknown extension, or is
/// not a well-formed definition
pub fn load_definition(path: impl AsRef<Path>) -> Result<DatasetSchema, SchemaError> {
    let path = path.as_ref();
    let format = DefinitionFormat::from_path(path)
        .ok_or_else(|| SchemaError::UnknownFormat(path.to_path_buf()))?;
    let text = std::fs::read_to_string(path).map_err(|e| SchemaError::io_error(path, e))?;
    let schema = parse_definition(&text, format)?;
    tracing::debug!(
        path = %path.display(),
        classes = schema.classes.len(),
        relationships = schema.relationships.len(),
        "schema definition loaded"
    );
    Ok(schema)
}

fn check_definition(schema: &DatasetSchema) -> Result<(), SchemaError> {
    for (i, class) in schema.classes.iter().enumerate() {
        if schema.classes[..i].iter().any(|c| c.is_named(&class.name)) {
            return Err(SchemaError::InvalidDefinition(format!(
                "class {} defined twice",
                class.name
            )));
        }
        for (j, field) in class.fields.iter().enumerate() {
            if class.fields[..j].iter().any(|f| f.is_named(&field.name)) {
                return Err(SchemaError::InvalidDefinition(format!(
                    "field {} defined twice in {}",
                    field.name, class.name
                )));
            }
        }
    }
    for relationship in &schema.relationships {
        let referenced = relationship
            .origin_classes
            .iter()
            .chain(&relationship.destination_classes);
        for class in referenced {
            if schema.class(class).is_none() {
                return Err(SchemaError::InvalidDefinition(format!(
                    "relationship {} references unknown class {class}",
                    relationship.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pi_data::{ClassKind, FieldType};
    use pretty_assertions::assert_eq;

    const YAML: &str = r"
name: ladm
classes:
  - name: SpatialUnit
    kind: FeatureClass
    fields:
      - { name: OBJECTID, type: ObjectId, nullable: false }
      - { name: legal_id, type: String, length: 50, nullable: false }
  - name: Party
    kind: Table
    fields:
      - { name: name, type: String, length: 100 }
      - { name: spatialunit_fk, type: Guid }
relationships:
  - name: SpatialUnit_Party
    origin_classes: [SpatialUnit]
    destination_classes: [Party]
    origin_primary_key: GlobalID
    origin_foreign_key: spatialunit_fk
    cardinality: OneToMany
";

    #[test]
    fn yaml_definition_parses() {
        let schema = parse_definition(YAML, DefinitionFormat::Yaml).unwrap();
        assert_eq!(schema.name, "ladm");
        assert_eq!(schema.classes.len(), 2);
        let unit = schema.class("spatialunit").unwrap();
        assert_eq!(unit.kind, ClassKind::FeatureClass);
        let legal = unit.field("legal_id").unwrap();
        assert_eq!(legal.field_type, FieldType::String);
        assert_eq!(legal.length, Some(50));
        assert!(!legal.nullable);
        assert!(schema.class("Party").unwrap().field("name").unwrap().nullable);
    }

    #[test]
    fn json_and_yaml_agree() {
        let from_yaml = parse_definition(YAML, DefinitionFormat::Yaml).unwrap();
        let json = serde_json::to_string(&from_yaml).unwrap();
        let from_json = parse_definition(&json, DefinitionFormat::Json).unwrap();
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn dangling_relationship_is_rejected() {
        let text = r#"{"name":"x","classes":[],"relationships":[{
            "name":"r","origin_classes":["A"],"destination_classes":["B"],
            "origin_primary_key":"GlobalID","origin_foreign_key":"a_fk",
            "cardinality":"OneToMany"}]}"#;
        let err = parse_definition(text, DefinitionFormat::Json).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefinition(_)));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(DefinitionFormat::from_path(Path::new("a/ladm.YML")), Some(DefinitionFormat::Yaml));
        assert_eq!(DefinitionFormat::from_path(Path::new("ladm.json")), Some(DefinitionFormat::Json));
        assert_eq!(DefinitionFormat::from_path(Path::new("ladm.xml")), None);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ladm.yaml");
        std::fs::write(&path, YAML).unwrap();
        let schema = load_definition(&path).unwrap();
        assert_eq!(schema.relationships.len(), 1);

        let missing = load_definition(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(missing, SchemaError::Io { .. }));
    }
}
