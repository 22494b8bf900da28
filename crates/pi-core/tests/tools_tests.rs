use pi_consensus::{ApprovalState, BoundaryState};
use pi_core::*;
use pi_data::{ClassDef, DataAccess, DatasetSchema, Filter, InMemoryDataset};
use pi_schema::SchemaError;
use pi_signature::{CapturedImages, IntakeError, IntakeOutcome, SignatureCapture};
use pi_test_utils::{ladm_schema, parcel_schema, sample_load, write_png};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

const CONFIG: &str = r#"
SURVEY_DATASET_NAME = "survey.json"
INSPECTION_DATASET_NAME = "inspection.json"
PARCEL_TYPE = "SpatialUnit"
PARCEL_RECORD_FIELD = "record"
PARCEL_FABRIC_PATH = "Parcel/ParcelFabric"
PARCEL_DATASET = "Parcel"
REFERENCE_OBJECTS_DATASET = "ReferenceObjects"
INSPECTION_MAP = "Inspection"
LAYERFILES_RELATIVE_PATH = "layers"
PARCEL_SCHEMA_PATH = "schemas/parcel.json"
LADM_SCHEMA_PATH = "schemas/ladm.json"
SIGNATURE_CAPTURE_TOOL_RELATIVE_PATH = "bin/capture"
SIGNATURE_CAPTURE_TOOL_FILE_PATH_COMMAND = "-f"
SIGNATURE_CAPTURE_TOOL_PARTY_NAME_COMMAND = "-n"
SIGNATURES_RELATIVE_PATH = "signatures"
PERMANENT_CLASS_MARKER = "publicinspection"
"#;

struct Project {
    dir: TempDir,
    settings: InspectionSettings,
}

impl Project {
    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn write_json(path: &Path, schema: &DatasetSchema) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_string_pretty(schema).unwrap()).unwrap();
}

fn project() -> Project {
    project_with_parcel_schema(&parcel_schema())
}

fn project_with_parcel_schema(parcel: &DatasetSchema) -> Project {
    let dir = tempfile::tempdir().unwrap();
    write_json(&dir.path().join("schemas/ladm.json"), &ladm_schema());
    write_json(&dir.path().join("schemas/parcel.json"), parcel);
    std::fs::create_dir_all(dir.path().join("layers")).unwrap();
    std::fs::write(dir.path().join("layers/SpatialUnit.lyrx"), "{}").unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, CONFIG).unwrap();

    let config = Configuration::from_path(&config_path).unwrap();
    let settings = InspectionSettings::resolve(&config, dir.path()).unwrap();
    Project { dir, settings }
}

fn write_load(project: &Project) -> PathBuf {
    let path = project.path("load.json");
    sample_load().dataset.save(&path).unwrap();
    path
}

fn completed(project: &Project, load: &Path) -> SetupReport {
    match SetupDataSources::new(project.settings.clone()).execute(load).unwrap() {
        SetupOutcome::Completed(report) => report,
        SetupOutcome::Invalid(report) => panic!("load rejected: {:?}", report.messages()),
    }
}

struct DeskCapture {
    dir: PathBuf,
}

impl SignatureCapture for DeskCapture {
    fn capture(
        &mut self,
        party_id: Uuid,
        _party_name: &str,
    ) -> std::result::Result<Option<CapturedImages>, IntakeError> {
        Ok(Some(CapturedImages {
            signature: write_png(&self.dir, &party_id.to_string()),
            fingerprint: None,
        }))
    }
}

fn boundary_states(dataset: &InMemoryDataset) -> Vec<(String, String)> {
    dataset
        .search("Boundary", Some(&["neighbors", "state"]), None)
        .unwrap()
        .iter()
        .map(|r| {
            (
                r.text("neighbors").unwrap_or_default().to_string(),
                r.text("state").unwrap_or_default().to_string(),
            )
        })
        .collect()
}

#[test]
fn test_setup_builds_every_data_source() {
    let project = project();
    let load = write_load(&project);

    let report = completed(&project, &load);

    assert_eq!(report.survey_rows, 9);
    assert_eq!(report.merge.rows_appended(), 9);
    assert_eq!(report.merge.cleanup.orphans_removed, 1);
    assert_eq!(report.records_created, 1);
    assert_eq!(report.fabric.parcels, 2);
    assert_eq!(report.fabric.unlinked, 0);
    assert!(report.map.saved);

    let inspection = InMemoryDataset::load(&project.settings.inspection_dataset).unwrap();
    assert_eq!(inspection.count("SpatialUnit").unwrap(), 2);
    assert_eq!(inspection.count("Party").unwrap(), 3);
    assert!(project.settings.survey_dataset.exists());
    assert!(project.settings.inspection_map_path().exists());
}

#[test]
fn test_invalid_load_changes_nothing() {
    let project = project();
    let mut schema = ladm_schema();
    schema.classes.retain(|c| c.name != "Boundary");
    let schema = schema.with_class(ClassDef::table("Unrelated"));
    let load = project.path("load.json");
    InMemoryDataset::from_schema(schema).save(&load).unwrap();

    let outcome = SetupDataSources::new(project.settings.clone())
        .execute(&load)
        .unwrap();

    let SetupOutcome::Invalid(report) = outcome else {
        panic!("invalid load accepted");
    };
    assert_eq!(report.messages(), vec!["missing class Boundary".to_string()]);
    assert!(!project.settings.inspection_dataset.exists());
    assert!(!project.settings.survey_dataset.exists());
}

#[test]
fn test_missing_load_is_structural() {
    let project = project();
    let err = SetupDataSources::new(project.settings.clone())
        .execute(&project.path("absent.json"))
        .unwrap_err();
    assert!(matches!(err, PiError::Schema(SchemaError::SourceMissing(_))));
    assert!(err.is_structural());
}

#[test]
fn test_capture_then_recalculate() {
    let project = project();
    let load = write_load(&project);
    completed(&project, &load);

    let capture = DeskCapture {
        dir: project.settings.signatures_dir.clone(),
    };
    let outcome = CaptureSignatures::new(project.settings.clone())
        .execute_with(
            capture,
            "LEGAL-001",
            "Ana Perez",
            &[("North".to_string(), ApprovalState::No)],
        )
        .unwrap();
    let IntakeOutcome::Attached { approvals, boundaries, .. } = outcome else {
        panic!("expected attachment, got {outcome:?}");
    };
    assert_eq!(approvals.updated.len(), 2);
    assert_eq!(boundaries.updated.len(), 2);
    assert!(project.settings.scratch_dataset.exists());

    let report = CalculateBoundaries::new(project.settings.clone())
        .execute()
        .unwrap();
    assert_eq!(report.updated.len(), 3);
    assert_eq!(
        report.updated.iter().filter(|o| o.state == BoundaryState::NoProcessed).count(),
        1
    );

    let inspection = InMemoryDataset::load(&project.settings.inspection_dataset).unwrap();
    let mut states = boundary_states(&inspection);
    states.sort();
    assert_eq!(
        states,
        vec![
            ("East".to_string(), "In Process".to_string()),
            ("North".to_string(), "Rejected".to_string()),
            ("West".to_string(), "No Processed".to_string()),
        ]
    );
    assert_eq!(
        inspection
            .search("PublicInspection_Approval", None, Some(&Filter::eq("is_approved", "No")))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_unknown_party_is_skipped() {
    let project = project();
    let load = write_load(&project);
    completed(&project, &load);

    let capture = DeskCapture {
        dir: project.settings.signatures_dir.clone(),
    };
    let outcome = CaptureSignatures::new(project.settings.clone())
        .execute_with(capture, "LEGAL-001", "Nobody", &[])
        .unwrap();

    assert_eq!(outcome, IntakeOutcome::Skipped("no party selected".into()));
    assert!(!project.settings.scratch_dataset.exists());
}

#[test]
fn test_failed_attachment_keeps_created_approvals() {
    let mut parcel = parcel_schema();
    parcel.classes.retain(|c| !c.is_attachment_table());
    parcel
        .relationships
        .retain(|r| !r.destination_classes.iter().any(|d| d.ends_with("__ATTACH")));
    let project = project_with_parcel_schema(&parcel);
    let load = write_load(&project);
    completed(&project, &load);

    let capture = DeskCapture {
        dir: project.settings.signatures_dir.clone(),
    };
    let err = CaptureSignatures::new(project.settings.clone())
        .execute_with(capture, "LEGAL-001", "Ana Perez", &[])
        .unwrap_err();
    assert!(matches!(err, PiError::Intake(_)));

    let inspection = InMemoryDataset::load(&project.settings.inspection_dataset).unwrap();
    let approvals = inspection
        .search("PublicInspection_Approval", None, Some(&Filter::eq("is_approved", "No Processed")))
        .unwrap();
    assert!(!approvals.is_empty());
    assert_eq!(approvals.len(), inspection.count("PublicInspection_Approval").unwrap());
    assert!(inspection.count("PublicInspection_ApprovalSignature").unwrap() > 0);
    assert!(project.settings.scratch_dataset.exists());
}
