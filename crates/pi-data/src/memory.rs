//! In-memory dataset
//!
//! A complete dataset (schema plus rows) held in memory and persisted as a
//! single JSON document. Object ids are assigned on insert; global ids are
//! generated unless the caller supplies one.

use crate::access::{AttachmentStore, DataAccess, DataError, MatchSpec, SchemaAccess};
use crate::filter::Filter;
use crate::schema::{
    attachment_table_name, ClassDef, DatasetSchema, FieldDef, FieldType, ATTACH_DATA_FIELD,
    ATTACH_NAME_FIELD, ATTACH_REL_FIELD,
};
use crate::value::{ObjectId, Row, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Table {
    rows: Vec<Row>,
    next_object_id: i64,
}

/// Dataset held entirely in memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryDataset {
    schema: DatasetSchema,
    tables: IndexMap<String, Table>,
}

fn table_key(class: &str) -> String {
    class.to_ascii_lowercase()
}

fn class_not_found(class: &str) -> DataError {
    DataError::ClassNotFound(class.to_string())
}

fn resolve_field<'a>(def: &'a ClassDef, field: &str) -> Result<&'a FieldDef, DataError> {
    def.field(field).ok_or_else(|| DataError::FieldNotFound {
        class: def.name.clone(),
        field: field.to_string(),
    })
}

fn check_filter(def: &ClassDef, filter: &Filter) -> Result<(), DataError> {
    for field in filter.fields() {
        resolve_field(def, field)?;
    }
    Ok(())
}

impl InMemoryDataset {
    /// Empty dataset with an empty schema
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_schema(DatasetSchema::new(name))
    }

    /// Empty dataset shaped by `schema`
    #[must_use]
    pub fn from_schema(schema: DatasetSchema) -> Self {
        let tables = schema
            .classes
            .iter()
            .map(|c| (table_key(&c.name), Table::default()))
            .collect();
        Self { schema, tables }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Load a dataset document
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a dataset document
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DataError::io_error(path, e))?;
        let dataset = serde_json::from_str(&text)?;
        tracing::debug!(path = %path.display(), "dataset loaded");
        Ok(dataset)
    }

    /// Persist as a dataset document, creating parent folders
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DataError::io_error(parent, e))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|e| DataError::io_error(path, e))?;
        tracing::debug!(path = %path.display(), "dataset saved");
        Ok(())
    }

    fn def(&self, class: &str) -> Result<&ClassDef, DataError> {
        self.schema.class(class).ok_or_else(|| class_not_found(class))
    }
}

impl DataAccess for InMemoryDataset {
    fn search(
        &self,
        class: &str,
        fields: Option<&[&str]>,
        filter: Option<&Filter>,
    ) -> Result<Vec<Row>, DataError> {
        let def = self.def(class)?;
        if let Some(filter) = filter {
            check_filter(def, filter)?;
        }
        let projection: Option<Vec<&str>> = fields
            .map(|names| {
                names
                    .iter()
                    .map(|n| resolve_field(def, n).map(|f| f.name.as_str()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        let rows = self
            .tables
            .get(&table_key(class))
            .map(|t| t.rows.as_slice())
            .unwrap_or_default();

        Ok(rows
            .iter()
            .filter(|row| filter.map_or(true, |f| f.matches(row)))
            .map(|row| match &projection {
                None => row.clone(),
                Some(names) => names
                    .iter()
                    .fold(Row::new(), |acc, name| acc.with(*name, row.value(name))),
            })
            .collect())
    }

    fn insert(
        &mut self,
        class: &str,
        fields: &[&str],
        tuples: Vec<Vec<Value>>,
    ) -> Result<Vec<ObjectId>, DataError> {
        let def = self.schema.class(class).ok_or_else(|| class_not_found(class))?;
        let supplied: Vec<&FieldDef> = fields
            .iter()
            .map(|f| resolve_field(def, f))
            .collect::<Result<_, _>>()?;
        if let Some(oid) = supplied.iter().find(|f| f.field_type == FieldType::ObjectId) {
            return Err(DataError::ReadOnlyField {
                class: def.name.clone(),
                field: oid.name.clone(),
            });
        }

        let table = self.tables.entry(table_key(class)).or_default();
        let mut next = table.next_object_id;
        let mut staged = Vec::with_capacity(tuples.len());
        let mut ids = Vec::with_capacity(tuples.len());

        for tuple in tuples {
            if tuple.len() != fields.len() {
                return Err(DataError::ArityMismatch {
                    class: def.name.clone(),
                    expected: fields.len(),
                    actual: tuple.len(),
                });
            }
            let mut row = Row::new();
            for field in &def.fields {
                let given = supplied
                    .iter()
                    .position(|s| s.is_named(&field.name))
                    .map(|i| tuple[i].clone());
                let value = match field.field_type {
                    FieldType::ObjectId => {
                        next += 1;
                        ids.push(ObjectId(next));
                        Value::Integer(next)
                    }
                    FieldType::GlobalId => given
                        .filter(|v| !v.is_null())
                        .unwrap_or_else(|| Value::Guid(Uuid::new_v4())),
                    _ => given.unwrap_or_default(),
                };
                if value.is_null() && !field.nullable {
                    return Err(DataError::NotNullable {
                        class: def.name.clone(),
                        field: field.name.clone(),
                    });
                }
                row.set(field.name.clone(), value);
            }
            staged.push(row);
        }

        table.rows.extend(staged);
        table.next_object_id = next;
        Ok(ids)
    }

    fn update(
        &mut self,
        class: &str,
        fields: &[&str],
        values: &[Value],
        filter: &Filter,
    ) -> Result<usize, DataError> {
        let def = self.schema.class(class).ok_or_else(|| class_not_found(class))?;
        if fields.len() != values.len() {
            return Err(DataError::ArityMismatch {
                class: def.name.clone(),
                expected: fields.len(),
                actual: values.len(),
            });
        }
        check_filter(def, filter)?;
        let targets: Vec<&FieldDef> = fields
            .iter()
            .map(|f| resolve_field(def, f))
            .collect::<Result<_, _>>()?;
        for (field, value) in targets.iter().zip(values) {
            if field.field_type.is_system() {
                return Err(DataError::ReadOnlyField {
                    class: def.name.clone(),
                    field: field.name.clone(),
                });
            }
            if value.is_null() && !field.nullable {
                return Err(DataError::NotNullable {
                    class: def.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        let Some(table) = self.tables.get_mut(&table_key(class)) else {
            return Ok(0);
        };
        let mut touched = 0;
        for row in table.rows.iter_mut().filter(|r| filter.matches(r)) {
            for (field, value) in targets.iter().zip(values) {
                row.set(field.name.clone(), value.clone());
            }
            touched += 1;
        }
        Ok(touched)
    }

    fn delete(&mut self, class: &str, filter: &Filter) -> Result<usize, DataError> {
        let def = self.def(class)?;
        check_filter(def, filter)?;
        let Some(table) = self.tables.get_mut(&table_key(class)) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|r| !filter.matches(r));
        Ok(before - table.rows.len())
    }

    fn count(&self, class: &str) -> Result<usize, DataError> {
        self.def(class)?;
        Ok(self
            .tables
            .get(&table_key(class))
            .map_or(0, |t| t.rows.len()))
    }

    fn find_table_path(&self, class: &str) -> Result<String, DataError> {
        let def = self.def(class)?;
        Ok(match &def.dataset {
            Some(dataset) => format!("{}/{}/{}", self.schema.name, dataset, def.name),
            None => format!("{}/{}", self.schema.name, def.name),
        })
    }
}

impl SchemaAccess for InMemoryDataset {
    fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    fn create_class(&mut self, def: ClassDef) -> Result<(), DataError> {
        if self.schema.class(&def.name).is_some() {
            return Err(DataError::ClassExists(def.name));
        }
        self.tables.insert(table_key(&def.name), Table::default());
        self.schema.classes.push(def);
        Ok(())
    }

    fn add_field(&mut self, class: &str, field: FieldDef) -> Result<(), DataError> {
        let def = self
            .schema
            .class_mut(class)
            .ok_or_else(|| class_not_found(class))?;
        if def.has_field(&field.name) {
            return Err(DataError::FieldExists {
                class: def.name.clone(),
                field: field.name,
            });
        }
        let table = self.tables.entry(table_key(class)).or_default();
        if !field.nullable && !table.rows.is_empty() {
            return Err(DataError::NotNullable {
                class: def.name.clone(),
                field: field.name,
            });
        }
        for row in &mut table.rows {
            row.set(field.name.clone(), Value::Null);
        }
        def.fields.push(field);
        Ok(())
    }

    fn delete_field(&mut self, class: &str, field: &str) -> Result<(), DataError> {
        let def = self
            .schema
            .class_mut(class)
            .ok_or_else(|| class_not_found(class))?;
        let Some(position) = def.fields.iter().position(|f| f.is_named(field)) else {
            return Err(DataError::FieldNotFound {
                class: def.name.clone(),
                field: field.to_string(),
            });
        };
        def.fields.remove(position);
        if let Some(table) = self.tables.get_mut(&table_key(class)) {
            for row in &mut table.rows {
                row.remove(field);
            }
        }
        Ok(())
    }

    fn truncate(&mut self, class: &str) -> Result<usize, DataError> {
        self.def(class)?;
        let table = self.tables.entry(table_key(class)).or_default();
        let removed = table.rows.len();
        table.rows.clear();
        Ok(removed)
    }

    fn recreate(&mut self, schema: DatasetSchema) -> Result<(), DataError> {
        tracing::debug!(dataset = %schema.name, classes = schema.classes.len(), "recreating dataset");
        *self = Self::from_schema(schema);
        Ok(())
    }
}

impl AttachmentStore for InMemoryDataset {
    fn add_attachments(
        &mut self,
        class: &str,
        key_field: &str,
        matches: &dyn DataAccess,
        spec: &MatchSpec<'_>,
    ) -> Result<usize, DataError> {
        let def = self.def(class)?;
        resolve_field(def, key_field)?;
        let attach_table = attachment_table_name(&def.name);
        let owner_key = def
            .global_id_field()
            .map_or_else(|| key_field.to_string(), |f| f.name.clone());
        self.def(&attach_table)?;

        let staged = matches.search(spec.table, Some(&[spec.key_field, spec.value_field]), None)?;
        let mut tuples = Vec::with_capacity(staged.len());
        for entry in staged {
            let key = entry.value(spec.key_field);
            let Some(path) = entry.text(spec.value_field) else {
                tracing::warn!(key = %key, "staged attachment without a file path");
                continue;
            };
            let owners = self.search(
                class,
                Some(&[owner_key.as_str()]),
                Some(&Filter::Eq(key_field.to_string(), key.clone())),
            )?;
            if owners.is_empty() {
                tracing::warn!(class, key = %key, "no row to attach to");
                continue;
            }
            let file_name = Path::new(path)
                .file_name()
                .map_or_else(|| path.to_string(), |n| n.to_string_lossy().into_owned());
            for owner in owners {
                tuples.push(vec![
                    owner.value(&owner_key),
                    Value::Text(file_name.clone()),
                    Value::Text(path.to_string()),
                ]);
            }
        }

        let written = tuples.len();
        self.insert(
            &attach_table,
            &[ATTACH_REL_FIELD, ATTACH_NAME_FIELD, ATTACH_DATA_FIELD],
            tuples,
        )?;
        Ok(written)
    }
}
