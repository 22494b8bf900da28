//! Setup of the survey and inspection data sources from a load dataset

use crate::config::InspectionSettings;
use crate::error::Result;
use pi_data::InMemoryDataset;
use pi_merge::{
    clean_inspection_map, refresh_inspection_map, snapshot_survey, FabricSummary, MapSettings,
    MapSummary, MergeEngine, MergeReport, ParcelFabric, ProjectMap, RecordFabric,
};
use pi_schema::{load_definition, SchemaValidator, ValidationReport};
use std::path::Path;

/// What a completed setup did
#[derive(Debug, Clone)]
pub struct SetupReport {
    pub survey_rows: usize,
    pub merge: MergeReport,
    pub records_created: usize,
    pub fabric: FabricSummary,
    pub map: MapSummary,
}

/// How a setup ended
#[derive(Debug, Clone)]
pub enum SetupOutcome {
    /// The load dataset failed validation; nothing was changed
    Invalid(ValidationReport),
    Completed(SetupReport),
}

/// Validate a load dataset and rebuild the inspection data sources from it
#[derive(Debug, Clone)]
pub struct SetupDataSources {
    settings: InspectionSettings,
}

impl SetupDataSources {
    #[inline]
    #[must_use]
    pub fn new(settings: InspectionSettings) -> Self {
        Self { settings }
    }

    /// Validate `load_path` against the LADM reference schema
    ///
    /// # Errors
    /// Returns error if the load dataset or the reference definition cannot
    /// be read
    pub fn validate(&self, load_path: &Path) -> Result<ValidationReport> {
        let validator = SchemaValidator::from_definition(&self.settings.ladm_schema)?;
        let report = validator.validate_path(load_path)?;
        tracing::info!(valid = report.is_valid(), issues = report.issues.len(), "validation done");
        Ok(report)
    }

    /// Run the whole setup
    ///
    /// Survey snapshot, map cleanup, inspection recreate and merge, parcel
    /// records, fabric, and map refresh, in that order.
    ///
    /// # Errors
    /// Returns error on any structural failure; earlier steps stay committed
    pub fn execute(&self, load_path: &Path) -> Result<SetupOutcome> {
        let settings = &self.settings;
        tracing::info!(load = %load_path.display(), "load data source");
        tracing::info!(survey = %settings.survey_dataset.display(), "survey data source");
        tracing::info!(inspection = %settings.inspection_dataset.display(), "inspection data source");

        let validation = self.validate(load_path)?;
        if !validation.is_valid() {
            for message in validation.messages() {
                tracing::error!(issue = %message, "validation error");
            }
            return Ok(SetupOutcome::Invalid(validation));
        }
        let load = InMemoryDataset::load(load_path)?;

        let mut survey = InMemoryDataset::new(dataset_name(&settings.survey_dataset));
        let survey_rows = snapshot_survey(&load, &mut survey)?;
        survey.save(&settings.survey_dataset)?;

        let mut map = ProjectMap::open(settings.inspection_map_path(), &settings.inspection_map)?;
        clean_inspection_map(&mut map);

        let mut parcel_schema = load_definition(&settings.parcel_schema)?;
        parcel_schema.name = dataset_name(&settings.inspection_dataset);
        let mut inspection = InMemoryDataset::new(parcel_schema.name.clone());
        let merge = MergeEngine::new(&settings.permanent_marker).merge_into(
            &load,
            &mut inspection,
            Some(&parcel_schema),
        )?;

        let mut fabric = RecordFabric::new();
        let records_created = fabric.create_parcel_records(
            &mut inspection,
            &settings.parcel_type,
            &settings.parcel_record_field,
        )?;
        let fabric_summary = fabric.build_parcel_fabric(&inspection, &settings.parcel_fabric_path)?;
        inspection.save(&settings.inspection_dataset)?;

        let map_settings = MapSettings {
            parcel_dataset: settings.parcel_dataset.clone(),
            reference_objects_dataset: settings.reference_objects_dataset.clone(),
            spatial_unit_layer: settings.model.spatial_unit.class.clone(),
            boundary_layer: settings.model.boundary.class.clone(),
            layer_files: settings.layer_files.clone(),
        };
        let map_summary = refresh_inspection_map(&mut map, &inspection, &map_settings)?;

        tracing::info!(
            survey_rows,
            appended = merge.rows_appended(),
            records = records_created,
            layers = map_summary.layers,
            "data sources ready"
        );
        Ok(SetupOutcome::Completed(SetupReport {
            survey_rows,
            merge,
            records_created,
            fabric: fabric_summary,
            map: map_summary,
        }))
    }
}

/// Dataset name from its file stem
fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().into_owned())
}
