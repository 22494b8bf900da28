//! Dataset schema model
//!
//! Describes classes (feature classes and tables), their fields, and the
//! relationship classes that link them. Schemas are plain data: they are read
//! from a definition source and compared or instantiated, never invented.

use serde::{Deserialize, Serialize};

/// Storage-assigned object id field
pub const OBJECT_ID_FIELD: &str = "OBJECTID";
/// Storage-assigned global id field
pub const GLOBAL_ID_FIELD: &str = "GlobalID";
/// Geometry field of feature classes
pub const SHAPE_FIELD: &str = "Shape";
/// Derived geometry-system fields, maintained by the spatial engine
pub const GEOMETRY_SYSTEM_FIELDS: [&str; 2] = ["Shape_Length", "Shape_Area"];

/// Field data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    ObjectId,
    GlobalId,
    Guid,
    String,
    Integer,
    SmallInteger,
    Double,
    Date,
    Geometry,
}

impl FieldType {
    /// Types whose values are assigned by storage, never by callers
    #[inline]
    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Self::ObjectId | Self::GlobalId)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ObjectId => "OID",
            Self::GlobalId => "GlobalID",
            Self::Guid => "Guid",
            Self::String => "String",
            Self::Integer => "Integer",
            Self::SmallInteger => "SmallInteger",
            Self::Double => "Double",
            Self::Date => "Date",
            Self::Geometry => "Geometry",
        };
        write!(f, "{name}")
    }
}

fn nullable_default() -> bool {
    true
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default = "nullable_default")]
    pub nullable: bool,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

impl FieldDef {
    /// Nullable field with no length or domain
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            length: None,
            nullable: true,
            domain: None,
            alias: None,
        }
    }

    /// Text field of the given length
    #[must_use]
    pub fn text(name: impl Into<String>, length: u32) -> Self {
        Self::new(name, FieldType::String).with_length(length)
    }

    #[must_use]
    pub fn guid(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Guid)
    }

    #[must_use]
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Case-insensitive name comparison
    #[inline]
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Derived geometry fields (`Shape_Length`, `Shape_Area`)
    #[must_use]
    pub fn is_geometry_system(&self) -> bool {
        GEOMETRY_SYSTEM_FIELDS.iter().any(|n| self.is_named(n))
    }
}

/// Kind of class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    FeatureClass,
    Table,
}

/// Feature class or table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub kind: ClassKind,
    /// Sub-dataset (feature dataset) holding the class, if any
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl ClassDef {
    /// Bare class with no fields
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            dataset: None,
            fields: Vec::new(),
        }
    }

    /// Table with `OBJECTID` and `GlobalID`
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Table)
            .with_field(FieldDef::new(OBJECT_ID_FIELD, FieldType::ObjectId).not_null())
            .with_field(FieldDef::new(GLOBAL_ID_FIELD, FieldType::GlobalId).not_null())
    }

    /// Feature class with `OBJECTID`, `GlobalID` and `Shape`
    #[must_use]
    pub fn feature_class(name: impl Into<String>) -> Self {
        let mut class = Self::table(name)
            .with_field(FieldDef::new(SHAPE_FIELD, FieldType::Geometry));
        class.kind = ClassKind::FeatureClass;
        class
    }

    /// Attachment table for `class`
    #[must_use]
    pub fn attachment_table(class: &str) -> Self {
        Self::new(attachment_table_name(class), ClassKind::Table)
            .with_field(FieldDef::new("ATTACHMENTID", FieldType::ObjectId).not_null())
            .with_field(FieldDef::guid(ATTACH_REL_FIELD))
            .with_field(FieldDef::text(ATTACH_NAME_FIELD, 250))
            .with_field(FieldDef::text(ATTACH_DATA_FIELD, 1024))
    }

    #[must_use]
    pub fn in_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Field by case-insensitive name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.is_named(name))
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    #[must_use]
    pub fn object_id_field(&self) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.field_type == FieldType::ObjectId)
    }

    #[must_use]
    pub fn global_id_field(&self) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.field_type == FieldType::GlobalId)
    }

    #[must_use]
    pub fn shape_field(&self) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.field_type == FieldType::Geometry)
    }

    /// Attachment tables are storage plumbing, not inspection data
    #[must_use]
    pub fn is_attachment_table(&self) -> bool {
        self.name.to_ascii_lowercase().ends_with("__attach")
    }
}

/// Attachment table name for a class
#[must_use]
pub fn attachment_table_name(class: &str) -> String {
    format!("{class}__ATTACH")
}

/// Attachment row: global id of the owning row
pub const ATTACH_REL_FIELD: &str = "REL_GLOBALID";
/// Attachment row: file name
pub const ATTACH_NAME_FIELD: &str = "ATT_NAME";
/// Attachment row: stored file path
pub const ATTACH_DATA_FIELD: &str = "DATA_PATH";

/// Relationship cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToMany,
}

/// Declarative foreign-key linkage between classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipClassDef {
    pub name: String,
    pub origin_classes: Vec<String>,
    pub destination_classes: Vec<String>,
    /// Key field on the origin side
    pub origin_primary_key: String,
    /// Field on the destination side that holds the origin key
    pub origin_foreign_key: String,
    pub cardinality: Cardinality,
    /// Sub-dataset carrying the relationship, if any
    #[serde(default)]
    pub dataset: Option<String>,
}

impl RelationshipClassDef {
    /// One-to-many relationship between a single origin and destination
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        origin_primary_key: impl Into<String>,
        origin_foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            origin_classes: vec![origin.into()],
            destination_classes: vec![destination.into()],
            origin_primary_key: origin_primary_key.into(),
            origin_foreign_key: origin_foreign_key.into(),
            cardinality: Cardinality::OneToMany,
            dataset: None,
        }
    }

    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination_classes.push(destination.into());
        self
    }

    #[must_use]
    pub fn in_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn is_many_to_many(&self) -> bool {
        self.cardinality == Cardinality::ManyToMany
    }
}

/// Complete schema of a dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub name: String,
    #[serde(default)]
    pub classes: Vec<ClassDef>,
    #[serde(default)]
    pub relationships: Vec<RelationshipClassDef>,
}

impl DatasetSchema {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_class(mut self, class: ClassDef) -> Self {
        self.classes.push(class);
        self
    }

    #[must_use]
    pub fn with_relationship(mut self, relationship: RelationshipClassDef) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Class by case-insensitive name
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.is_named(name))
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassDef> {
        self.classes.iter_mut().find(|c| c.is_named(name))
    }

    /// Classes of one kind, in definition order
    pub fn classes_of(&self, kind: ClassKind) -> impl Iterator<Item = &ClassDef> {
        self.classes.iter().filter(move |c| c.kind == kind)
    }

    /// Distinct sub-dataset names, in first-seen order
    #[must_use]
    pub fn sub_datasets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let from_classes = self.classes.iter().filter_map(|c| c.dataset.as_deref());
        let from_relationships = self
            .relationships
            .iter()
            .filter_map(|r| r.dataset.as_deref());
        for name in from_classes.chain(from_relationships) {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name);
            }
        }
        names
    }

    /// Relationship classes carried directly by `dataset` (`None` = root)
    pub fn relationships_in<'a>(
        &'a self,
        dataset: Option<&'a str>,
    ) -> impl Iterator<Item = &'a RelationshipClassDef> + 'a {
        self.relationships
            .iter()
            .filter(move |r| match (r.dataset.as_deref(), dataset) {
                (None, None) => true,
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            })
    }
}
