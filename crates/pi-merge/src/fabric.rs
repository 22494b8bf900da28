//! Parcel fabric contract
//!
//! Deriving parcel records and building fabric topology belong to the spatial
//! engine. [`RecordFabric`] covers the record bookkeeping over any
//! [`Dataset`] so a merged dataset is complete without one.

use crate::error::MergeError;
use pi_data::{ClassDef, Dataset, FieldDef, Filter, Value, GLOBAL_ID_FIELD};

/// Parcel records class
pub const RECORDS_CLASS: &str = "Records";
/// Record name field on [`RECORDS_CLASS`]
pub const RECORD_NAME_FIELD: &str = "Name";
/// Parcel field linking to the record that created it
pub const CREATED_BY_RECORD_FIELD: &str = "CreatedByRecord";
/// Parcel field linking to the record that retired it
pub const RETIRED_BY_RECORD_FIELD: &str = "RetiredByRecord";

/// Result of building a fabric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FabricSummary {
    pub parcels: usize,
    pub records: usize,
    /// Parcels not linked to any record
    pub unlinked: usize,
}

/// Spatial engine operations run after a merge
pub trait ParcelFabric {
    /// Create one record per distinct `record_field` value of `parcel_class`
    /// and link the parcels to it; returns records created
    fn create_parcel_records(
        &mut self,
        dataset: &mut dyn Dataset,
        parcel_class: &str,
        record_field: &str,
    ) -> Result<usize, MergeError>;

    /// Build fabric topology at `fabric_path`
    fn build_parcel_fabric(
        &mut self,
        dataset: &dyn Dataset,
        fabric_path: &str,
    ) -> Result<FabricSummary, MergeError>;
}

/// Record bookkeeping without topology
#[derive(Debug, Clone, Default)]
pub struct RecordFabric {
    parcel_class: Option<String>,
    built: Vec<String>,
}

impl RecordFabric {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fabric paths built so far
    #[must_use]
    pub fn built(&self) -> &[String] {
        &self.built
    }
}

fn ensure_record_schema(dataset: &mut dyn Dataset, parcel_class: &str) -> Result<(), MergeError> {
    if dataset.class_def(RECORDS_CLASS).is_none() {
        dataset.create_class(
            ClassDef::table(RECORDS_CLASS).with_field(FieldDef::text(RECORD_NAME_FIELD, 255)),
        )?;
    }
    if !dataset
        .class_def(parcel_class)
        .is_some_and(|c| c.has_field(CREATED_BY_RECORD_FIELD))
    {
        dataset.add_field(parcel_class, FieldDef::guid(CREATED_BY_RECORD_FIELD))?;
    }
    Ok(())
}

impl ParcelFabric for RecordFabric {
    fn create_parcel_records(
        &mut self,
        dataset: &mut dyn Dataset,
        parcel_class: &str,
        record_field: &str,
    ) -> Result<usize, MergeError> {
        if dataset.class_def(parcel_class).is_none() {
            return Err(MergeError::Fabric(format!("parcel class {parcel_class} not found")));
        }
        ensure_record_schema(dataset, parcel_class)?;

        let parcels = dataset.search(parcel_class, Some(&[record_field]), Some(&Filter::not_null(record_field)))?;
        let mut names: Vec<Value> = Vec::new();
        for parcel in parcels {
            let name = parcel.value(record_field);
            if !names.iter().any(|n| n.matches(&name)) {
                names.push(name);
            }
        }

        let mut created = 0;
        for name in names {
            let existing = dataset.search(
                RECORDS_CLASS,
                Some(&[GLOBAL_ID_FIELD]),
                Some(&Filter::Eq(RECORD_NAME_FIELD.to_string(), Value::Text(name.to_string()))),
            )?;
            let record_id = match existing.first().and_then(|r| r.guid(GLOBAL_ID_FIELD)) {
                Some(id) => id,
                None => {
                    let record_id = uuid::Uuid::new_v4();
                    dataset.insert(
                        RECORDS_CLASS,
                        &[GLOBAL_ID_FIELD, RECORD_NAME_FIELD],
                        vec![vec![record_id.into(), name.to_string().into()]],
                    )?;
                    created += 1;
                    record_id
                }
            };
            dataset.update(
                parcel_class,
                &[CREATED_BY_RECORD_FIELD],
                &[record_id.into()],
                &Filter::Eq(record_field.to_string(), name),
            )?;
        }

        self.parcel_class = Some(parcel_class.to_string());
        tracing::info!(class = %parcel_class, records = created, "parcel records created");
        Ok(created)
    }

    fn build_parcel_fabric(
        &mut self,
        dataset: &dyn Dataset,
        fabric_path: &str,
    ) -> Result<FabricSummary, MergeError> {
        let Some(parcel_class) = self.parcel_class.clone() else {
            return Err(MergeError::Fabric("parcel records not created".to_string()));
        };
        let parcels = dataset.count(&parcel_class)?;
        let unlinked = dataset
            .search(&parcel_class, Some(&[CREATED_BY_RECORD_FIELD]), Some(&Filter::is_null(CREATED_BY_RECORD_FIELD)))?
            .len();
        let records = dataset.count(RECORDS_CLASS)?;
        if unlinked > 0 {
            tracing::warn!(class = %parcel_class, unlinked, "parcels without record");
        }
        self.built.push(fabric_path.to_string());
        tracing::info!(fabric = %fabric_path, parcels, records, "parcel fabric built");
        Ok(FabricSummary {
            parcels,
            records,
            unlinked,
        })
    }
}
