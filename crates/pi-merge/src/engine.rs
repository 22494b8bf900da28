//! Relationship-preserving merge
//!
//! A load dataset is absorbed into the inspection dataset in three phases:
//!
//! 1. **Append**: every feature class, then every table, is appended with a
//!    [`FieldMap`]. The destination assigns new identities and the
//!    [`IdentityMap`] records `source GlobalID -> new object id`.
//! 2. **Repair**: for every non-many-to-many relationship whose origin came
//!    from the load data, destination foreign keys still holding the old
//!    origin identity are rewritten to the new origin key.
//! 3. **Cleanup**: appended destination rows whose foreign key is null or
//!    names no origin row are removed, and the identity map is discarded.
//!
//! Cleanup always runs once repair has run, whatever repair reported.

use crate::error::MergeError;
use crate::field_map::FieldMap;
use crate::identity::{correlation_field_name, IdentityMap};
use pi_data::{
    ClassKind, DataError, Dataset, DatasetSchema, Filter, ObjectId, RelationshipClassDef, Value,
    OBJECT_ID_FIELD,
};
use std::collections::HashMap;

/// Marker identifying classes that belong to the permanent inspection schema
pub const DEFAULT_PERMANENT_MARKER: &str = "publicinspection";

/// What happened to one source class during append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendStatus {
    Appended,
    /// Source class had no rows; nothing was touched
    Empty,
    /// Inspection dataset has no class of that name
    NoDestination,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub class: String,
    pub status: AppendStatus,
    pub source_rows: usize,
    pub appended: usize,
}

/// A relationship whose foreign keys were re-pointed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedRelationship {
    pub name: String,
    pub origin: String,
    pub origin_primary_key: String,
    pub origin_foreign_key: String,
    /// Destination classes that had appended rows
    pub destinations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub repaired: Vec<RepairedRelationship>,
    /// Destination rows whose foreign key was rewritten
    pub rows_repointed: usize,
    /// Per-row update failures
    pub failed_rows: usize,
    /// Relationships skipped because their origin could not be read
    pub failed_relationships: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Appended destination rows removed as orphans
    pub orphans_removed: usize,
    /// Correlations dropped with the identity map
    pub correlations_discarded: usize,
    /// Destination classes whose orphan check failed
    pub failed_classes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub appended: Vec<AppendOutcome>,
    /// Classes whose append failed on row data
    pub failed_classes: Vec<String>,
    pub repair: RepairReport,
    pub cleanup: CleanupReport,
}

impl MergeReport {
    /// Rows appended across all classes
    #[must_use]
    pub fn rows_appended(&self) -> usize {
        self.appended.iter().map(|a| a.appended).sum()
    }
}

/// Dataset merge engine
#[derive(Debug, Clone)]
pub struct MergeEngine {
    permanent_marker: String,
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PERMANENT_MARKER)
    }
}

impl MergeEngine {
    #[must_use]
    pub fn new(permanent_marker: impl Into<String>) -> Self {
        Self {
            permanent_marker: permanent_marker.into().to_ascii_lowercase(),
        }
    }

    /// Whether `class` is part of the permanent schema rather than load data
    #[must_use]
    pub fn is_permanent(&self, class: &str) -> bool {
        class.to_ascii_lowercase().contains(&self.permanent_marker)
    }

    /// Merge `load` into `inspection`
    ///
    /// When `fresh_schema` is given the inspection dataset is destructively
    /// recreated with it first.
    ///
    /// # Errors
    /// Returns error on recreate failure or when either dataset becomes
    /// unusable during append; per-row and per-class data failures are logged
    /// and reported instead
    pub fn merge_into<L, I>(
        &self,
        load: &L,
        inspection: &mut I,
        fresh_schema: Option<&DatasetSchema>,
    ) -> Result<MergeReport, MergeError>
    where
        L: Dataset + ?Sized,
        I: Dataset + ?Sized,
    {
        if let Some(schema) = fresh_schema {
            inspection.recreate(schema.clone())?;
            tracing::info!(dataset = %schema.name, "inspection dataset recreated");
        }

        let mut report = MergeReport::default();
        let mut identities = IdentityMap::new();
        let classes: Vec<String> = load
            .class_names(ClassKind::FeatureClass)
            .into_iter()
            .chain(load.class_names(ClassKind::Table))
            .collect();

        for class in &classes {
            match self.append_one(load, inspection, class, &mut identities) {
                Ok(outcome) => report.appended.push(outcome),
                Err(e) if e.is_structural() => return Err(e),
                Err(e) => {
                    tracing::error!(class = %class, error = %e, "error appending data");
                    report.failed_classes.push(class.clone());
                }
            }
        }

        report.repair = self.fix_relationships(inspection, &identities);
        report.cleanup = self.clean_fix_relationships_data(inspection, identities, &report.repair.repaired);

        tracing::info!(
            rows = report.rows_appended(),
            repointed = report.repair.rows_repointed,
            orphans = report.cleanup.orphans_removed,
            "merge complete"
        );
        Ok(report)
    }

    /// Append every row of `class` from `load` into `inspection`
    ///
    /// A source class with no rows is skipped before anything is read or
    /// written. Count mismatches are logged only.
    ///
    /// # Errors
    /// Returns error if the source cannot be read or the insert is rejected
    pub fn append_one<L, I>(
        &self,
        load: &L,
        inspection: &mut I,
        class: &str,
        identities: &mut IdentityMap,
    ) -> Result<AppendOutcome, MergeError>
    where
        L: Dataset + ?Sized,
        I: Dataset + ?Sized,
    {
        tracing::info!(class = %class, "appending data");
        let source_rows = load.count(class)?;
        if source_rows == 0 {
            tracing::debug!(class = %class, "source is empty, nothing to append");
            return Ok(AppendOutcome {
                class: class.to_string(),
                status: AppendStatus::Empty,
                source_rows,
                appended: 0,
            });
        }

        let source_def = load
            .class_def(class)
            .ok_or_else(|| DataError::ClassNotFound(class.to_string()))?;
        let Some(destination_def) = inspection.class_def(class) else {
            tracing::warn!(class = %class, "no destination class, data not appended");
            return Ok(AppendOutcome {
                class: class.to_string(),
                status: AppendStatus::NoDestination,
                source_rows,
                appended: 0,
            });
        };
        let destination = destination_def.name.clone();
        let map = FieldMap::build(source_def, destination_def);
        if !map.unmapped().is_empty() {
            tracing::debug!(class = %class, fields = ?map.unmapped(), "destination fields left unmapped");
        }

        let rows = load.search(class, None, None)?;
        let tuples = rows.iter().map(|r| map.tuple(r)).collect();
        let before = inspection.count(&destination)?;
        let ids = inspection.insert(&destination, &map.destination_fields(), tuples)?;

        for (row, object_id) in rows.iter().zip(&ids) {
            let source_id = map.correlation_source().and_then(|f| row.guid(f));
            identities.record(&destination, source_id, *object_id);
        }

        let after = inspection.count(&destination)?;
        if after - before != source_rows {
            tracing::warn!(
                class = %class,
                input = source_rows,
                output = after - before,
                "append count mismatch"
            );
        }
        tracing::debug!(
            class = %class,
            input = source_rows,
            output = after,
            correlation = %correlation_field_name(&destination),
            "data appended"
        );

        Ok(AppendOutcome {
            class: destination,
            status: AppendStatus::Appended,
            source_rows,
            appended: ids.len(),
        })
    }

    /// Re-point foreign keys of appended rows to the new origin keys
    ///
    /// Relationships carried by the dataset root are repaired first, then
    /// those of each sub-dataset.
    pub fn fix_relationships<I: Dataset + ?Sized>(
        &self,
        inspection: &mut I,
        identities: &IdentityMap,
    ) -> RepairReport {
        tracing::info!("fixing relationships");
        let schema = inspection.schema().clone();
        let mut report = RepairReport::default();

        self.fix_dataset_relationships(inspection, &schema, None, identities, &mut report);
        for sub in schema.sub_datasets() {
            self.fix_dataset_relationships(inspection, &schema, Some(sub), identities, &mut report);
        }

        tracing::info!(
            relationships = report.repaired.len(),
            repointed = report.rows_repointed,
            failed = report.failed_rows,
            "relationships fixed"
        );
        report
    }

    fn repairable_origin<'a>(&self, relationship: &'a RelationshipClassDef) -> Option<&'a str> {
        if relationship.is_many_to_many() {
            return None;
        }
        relationship
            .origin_classes
            .iter()
            .find(|c| !self.is_permanent(c))
            .map(String::as_str)
    }

    fn fix_dataset_relationships<I: Dataset + ?Sized>(
        &self,
        inspection: &mut I,
        schema: &DatasetSchema,
        scope: Option<&str>,
        identities: &IdentityMap,
        report: &mut RepairReport,
    ) {
        for relationship in schema.relationships_in(scope) {
            let Some(origin) = self.repairable_origin(relationship) else {
                continue;
            };
            if !identities.correlates(origin) {
                continue;
            }
            tracing::debug!(
                relationship = %relationship.name,
                origin = %origin,
                correlation = %correlation_field_name(origin),
                "fixing relationship"
            );

            let new_keys = match read_new_keys(inspection, schema, origin, relationship, identities) {
                Ok(keys) => keys,
                Err(e) => {
                    tracing::error!(relationship = %relationship.name, error = %e, "cannot read origin keys");
                    report.failed_relationships.push(relationship.name.clone());
                    continue;
                }
            };

            let mut repaired = RepairedRelationship {
                name: relationship.name.clone(),
                origin: origin.to_string(),
                origin_primary_key: relationship.origin_primary_key.clone(),
                origin_foreign_key: relationship.origin_foreign_key.clone(),
                destinations: Vec::new(),
            };

            for destination in &relationship.destination_classes {
                let appended = identities.appended(destination);
                if appended.is_empty() {
                    continue;
                }
                let oid_field = object_id_field(schema, destination);
                let scope_filter = Filter::in_values(oid_field.as_str(), appended.iter().copied());

                for (source_id, object_id) in identities.correlations(origin) {
                    let Some(new_key) = new_keys.get(&object_id).filter(|v| !v.is_null()) else {
                        continue;
                    };
                    let filter = Filter::eq(relationship.origin_foreign_key.as_str(), source_id)
                        .and(scope_filter.clone());
                    match inspection.update(
                        destination,
                        &[relationship.origin_foreign_key.as_str()],
                        std::slice::from_ref(new_key),
                        &filter,
                    ) {
                        Ok(n) => report.rows_repointed += n,
                        Err(e) => {
                            tracing::error!(
                                relationship = %relationship.name,
                                destination = %destination,
                                source = %source_id,
                                error = %e,
                                "error fixing foreign key"
                            );
                            report.failed_rows += 1;
                        }
                    }
                }
                repaired.destinations.push(destination.clone());
            }
            report.repaired.push(repaired);
        }
    }

    /// Remove appended rows left without a valid parent and drop the map
    pub fn clean_fix_relationships_data<I: Dataset + ?Sized>(
        &self,
        inspection: &mut I,
        identities: IdentityMap,
        repaired: &[RepairedRelationship],
    ) -> CleanupReport {
        tracing::info!("cleaning fixed relationships");
        let mut report = CleanupReport::default();

        // Removing a parent can orphan rows of a chained child relationship,
        // so passes repeat until one removes nothing.
        for pass in 0..=repaired.len() {
            let removed = remove_orphan_pass(inspection, &identities, repaired, &mut report);
            report.orphans_removed += removed;
            if removed == 0 {
                break;
            }
            tracing::debug!(pass, removed, "orphan pass done");
        }
        report.failed_classes.sort();
        report.failed_classes.dedup();

        for relationship in repaired {
            tracing::debug!(
                correlation = %correlation_field_name(&relationship.origin),
                "correlation discarded"
            );
        }

        report.correlations_discarded = identities.len();
        drop(identities);
        report
    }
}

fn object_id_field(schema: &DatasetSchema, class: &str) -> String {
    schema
        .class(class)
        .and_then(|c| c.object_id_field())
        .map_or_else(|| OBJECT_ID_FIELD.to_string(), |f| f.name.clone())
}

/// New primary key of every appended origin row, by object id
fn read_new_keys<I: Dataset + ?Sized>(
    inspection: &I,
    schema: &DatasetSchema,
    origin: &str,
    relationship: &RelationshipClassDef,
    identities: &IdentityMap,
) -> Result<HashMap<ObjectId, Value>, DataError> {
    let oid_field = object_id_field(schema, origin);
    let rows = inspection.search(
        origin,
        Some(&[oid_field.as_str(), relationship.origin_primary_key.as_str()]),
        Some(&Filter::in_values(
            oid_field.as_str(),
            identities.appended(origin).iter().copied(),
        )),
    )?;
    Ok(rows
        .iter()
        .filter_map(|r| {
            let oid = r.value(&oid_field).as_integer()?;
            Some((ObjectId(oid), r.value(&relationship.origin_primary_key)))
        })
        .collect())
}

/// One orphan sweep over every repaired relationship; returns rows removed
fn remove_orphan_pass<I: Dataset + ?Sized>(
    inspection: &mut I,
    identities: &IdentityMap,
    repaired: &[RepairedRelationship],
    report: &mut CleanupReport,
) -> usize {
    let mut removed_total = 0;
    for relationship in repaired {
        let origin_keys = match inspection.search(
            &relationship.origin,
            Some(&[relationship.origin_primary_key.as_str()]),
            Some(&Filter::not_null(relationship.origin_primary_key.as_str())),
        ) {
            Ok(rows) => rows
                .into_iter()
                .map(|r| r.value(&relationship.origin_primary_key))
                .collect::<Vec<_>>(),
            Err(e) => {
                tracing::error!(relationship = %relationship.name, error = %e, "cannot read origin keys");
                report
                    .failed_classes
                    .extend(relationship.destinations.iter().cloned());
                continue;
            }
        };

        for destination in &relationship.destinations {
            match remove_orphans(inspection, relationship, destination, &origin_keys, identities) {
                Ok(0) => {}
                Ok(removed) => {
                    tracing::warn!(
                        relationship = %relationship.name,
                        destination = %destination,
                        removed,
                        "orphan rows removed"
                    );
                    removed_total += removed;
                }
                Err(e) => {
                    tracing::error!(destination = %destination, error = %e, "error removing orphans");
                    report.failed_classes.push(destination.clone());
                }
            }
        }
    }
    removed_total
}

fn remove_orphans<I: Dataset + ?Sized>(
    inspection: &mut I,
    relationship: &RepairedRelationship,
    destination: &str,
    origin_keys: &[Value],
    identities: &IdentityMap,
) -> Result<usize, DataError> {
    let oid_field = object_id_field(inspection.schema(), destination);
    let fk = relationship.origin_foreign_key.as_str();
    let rows = inspection.search(
        destination,
        Some(&[oid_field.as_str(), fk]),
        Some(&Filter::in_values(
            oid_field.as_str(),
            identities.appended(destination).iter().copied(),
        )),
    )?;

    let orphans: Vec<Value> = rows
        .iter()
        .filter(|r| {
            let key = r.value(fk);
            key.is_null() || !origin_keys.iter().any(|k| k.matches(&key))
        })
        .map(|r| r.value(&oid_field))
        .collect();
    if orphans.is_empty() {
        return Ok(0);
    }
    inspection.delete(destination, &Filter::in_values(oid_field.as_str(), orphans))
}
