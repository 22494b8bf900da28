//! Source-to-destination field mapping for append

use pi_data::{ClassDef, FieldType, Row, Value};

/// One mapped field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub destination: String,
    pub source: String,
}

/// How source rows of one class become destination rows
///
/// Every destination field except storage-managed ones is mapped from the
/// like-named source field (case-insensitive). Destination fields with no
/// source counterpart stay unmapped and receive null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    mappings: Vec<FieldMapping>,
    unmapped: Vec<String>,
    /// Source field holding the global identifier used for correlation
    correlation_source: Option<String>,
}

fn is_excluded(field_type: FieldType, name: &str, destination: &ClassDef) -> bool {
    matches!(field_type, FieldType::ObjectId | FieldType::GlobalId)
        || destination
            .field(name)
            .is_some_and(pi_data::FieldDef::is_geometry_system)
}

impl FieldMap {
    /// Build the map between `source` and `destination`
    #[must_use]
    pub fn build(source: &ClassDef, destination: &ClassDef) -> Self {
        let mut mappings = Vec::new();
        let mut unmapped = Vec::new();
        for field in &destination.fields {
            if is_excluded(field.field_type, &field.name, destination) {
                continue;
            }
            match source.field(&field.name) {
                Some(found) => mappings.push(FieldMapping {
                    destination: field.name.clone(),
                    source: found.name.clone(),
                }),
                None => unmapped.push(field.name.clone()),
            }
        }
        Self {
            mappings,
            unmapped,
            correlation_source: source.global_id_field().map(|f| f.name.clone()),
        }
    }

    #[must_use]
    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    /// Destination fields that will receive null
    #[must_use]
    pub fn unmapped(&self) -> &[String] {
        &self.unmapped
    }

    #[must_use]
    pub fn correlation_source(&self) -> Option<&str> {
        self.correlation_source.as_deref()
    }

    /// Destination field names in tuple order
    #[must_use]
    pub fn destination_fields(&self) -> Vec<&str> {
        self.mappings.iter().map(|m| m.destination.as_str()).collect()
    }

    /// Destination tuple for one source row
    #[must_use]
    pub fn tuple(&self, row: &Row) -> Vec<Value> {
        self.mappings.iter().map(|m| row.value(&m.source)).collect()
    }
}
