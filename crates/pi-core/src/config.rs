//! Configuration surface
//!
//! A flat key/value document in TOML, JSON, or YAML. Every key the tools need
//! is resolved once into [`InspectionSettings`]; a missing key fails startup.

use indexmap::IndexMap;
use pi_consensus::InspectionModel;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required key absent
    #[error("missing configuration key: {0}")]
    MissingKey(String),

    /// Configuration file does not exist
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    /// File extension is not TOML, JSON, or YAML
    #[error("unknown configuration format: {0}")]
    UnknownFormat(PathBuf),

    /// Value present but unusable
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// IO error reading the file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Scalar accepted as a configuration value
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

fn flatten(values: IndexMap<String, Scalar>) -> IndexMap<String, String> {
    values
        .into_iter()
        .map(|(k, v)| (k, v.into_text()))
        .collect()
}

/// Flat key/value configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    values: IndexMap<String, String>,
}

impl Configuration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file, choosing the syntax from its extension
    ///
    /// # Errors
    /// Returns error if the file is missing, unreadable, or malformed
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let config = match ext.as_deref() {
            Some("toml") => Self::from_toml_str(&text)?,
            Some("json") => Self::from_json_str(&text)?,
            Some("yaml" | "yml") => Self::from_yaml_str(&text)?,
            _ => return Err(ConfigError::UnknownFormat(path.to_path_buf())),
        };
        tracing::debug!(path = %path.display(), keys = config.len(), "configuration loaded");
        Ok(config)
    }

    /// # Errors
    /// Returns error if the text is not a flat TOML table
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            values: flatten(toml::from_str(text)?),
        })
    }

    /// # Errors
    /// Returns error if the text is not a flat JSON object
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            values: flatten(serde_json::from_str(text)?),
        })
    }

    /// # Errors
    /// Returns error if the text is not a flat YAML mapping
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            values: flatten(serde_yaml::from_str(text)?),
        })
    }

    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value of a required key
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingKey`] if the key is absent and
    /// [`ConfigError::InvalidValue`] if it is blank
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        let value = self
            .get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: "value is blank".to_string(),
            });
        }
        Ok(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Scratch workspace file used when `SCRATCH_DATASET_NAME` is not set
pub const DEFAULT_SCRATCH_DATASET: &str = "scratch.json";

/// Settings of every tool, resolved against the project folder
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionSettings {
    pub project_folder: PathBuf,
    pub survey_dataset: PathBuf,
    pub inspection_dataset: PathBuf,
    pub scratch_dataset: PathBuf,
    pub parcel_type: String,
    pub parcel_record_field: String,
    pub parcel_fabric_path: String,
    pub parcel_dataset: String,
    pub reference_objects_dataset: String,
    pub inspection_map: String,
    pub layer_files: PathBuf,
    pub parcel_schema: PathBuf,
    pub ladm_schema: PathBuf,
    pub signature_tool: PathBuf,
    pub signature_file_option: String,
    pub signature_name_option: String,
    pub signatures_dir: PathBuf,
    pub permanent_marker: String,
    pub model: InspectionModel,
}

impl InspectionSettings {
    /// Resolve every key; relative paths are taken from `project_folder`
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingKey`] for the first absent key
    pub fn resolve(config: &Configuration, project_folder: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let folder: PathBuf = project_folder.into();
        let path = |key: &str| config.require(key).map(|v| folder.join(v));
        let text = |key: &str| config.require(key).map(str::to_string);

        Ok(Self {
            survey_dataset: path("SURVEY_DATASET_NAME")?,
            inspection_dataset: path("INSPECTION_DATASET_NAME")?,
            scratch_dataset: folder.join(
                config
                    .get("SCRATCH_DATASET_NAME")
                    .unwrap_or(DEFAULT_SCRATCH_DATASET),
            ),
            parcel_type: text("PARCEL_TYPE")?,
            parcel_record_field: text("PARCEL_RECORD_FIELD")?,
            parcel_fabric_path: text("PARCEL_FABRIC_PATH")?,
            parcel_dataset: text("PARCEL_DATASET")?,
            reference_objects_dataset: text("REFERENCE_OBJECTS_DATASET")?,
            inspection_map: text("INSPECTION_MAP")?,
            layer_files: path("LAYERFILES_RELATIVE_PATH")?,
            parcel_schema: path("PARCEL_SCHEMA_PATH")?,
            ladm_schema: path("LADM_SCHEMA_PATH")?,
            signature_tool: path("SIGNATURE_CAPTURE_TOOL_RELATIVE_PATH")?,
            signature_file_option: text("SIGNATURE_CAPTURE_TOOL_FILE_PATH_COMMAND")?,
            signature_name_option: text("SIGNATURE_CAPTURE_TOOL_PARTY_NAME_COMMAND")?,
            signatures_dir: path("SIGNATURES_RELATIVE_PATH")?,
            permanent_marker: text("PERMANENT_CLASS_MARKER")?,
            model: model_from_config(config),
            project_folder: folder,
        })
    }

    /// Project map document file
    #[must_use]
    pub fn inspection_map_path(&self) -> PathBuf {
        self.project_folder
            .join(format!("{}.map.json", self.inspection_map))
    }
}

/// Default inspection model with any configured name overrides applied
#[must_use]
pub fn model_from_config(config: &Configuration) -> InspectionModel {
    let mut model = InspectionModel::default();
    let overrides: [(&str, &mut String); 21] = [
        ("SPATIALUNIT_NAME", &mut model.spatial_unit.class),
        ("SPATIALUNIT_ID_FIELD", &mut model.spatial_unit.id),
        ("SPATIALUNIT_LEGAL_ID_FIELD", &mut model.spatial_unit.legal_id),
        ("PARTY_NAME", &mut model.party.class),
        ("PARTY_ID_FIELD", &mut model.party.id),
        ("PARTY_NAME_FIELD", &mut model.party.name),
        ("PARTY_SPATIALUNIT_FK_FIELD", &mut model.party.spatial_unit_fk),
        ("BOUNDARY_NAME", &mut model.boundary.class),
        ("BOUNDARY_ID_FIELD", &mut model.boundary.id),
        ("BOUNDARY_SPATIALUNIT_FK_FIELD", &mut model.boundary.spatial_unit_fk),
        ("BOUNDARY_STATE_FIELD", &mut model.boundary.state),
        ("BOUNDARY_NEIGHBORS_FIELD", &mut model.boundary.neighbors),
        ("APPROVAL_NAME", &mut model.approval.class),
        ("APPROVAL_ID_FIELD", &mut model.approval.id),
        ("PARTY_FK_FIELD", &mut model.approval.party_fk),
        ("BOUNDARY_FK_FIELD", &mut model.approval.boundary_fk),
        ("APPROVAL_IS_APPROVED_FIELD", &mut model.approval.is_approved),
        ("APPROVAL_DATE_FIELD", &mut model.approval.date),
        ("APPROVAL_SIGNATURE_NAME", &mut model.approval_signature.class),
        ("APPROVAL_SIGNATURE_ID_FIELD", &mut model.approval_signature.id),
        ("APPROVAL_FK_FIELD", &mut model.approval_signature.approval_fk),
    ];
    for (key, slot) in overrides {
        if let Some(value) = config.get(key) {
            *slot = value.to_string();
        }
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOML: &str = r#"
SURVEY_DATASET_NAME = "survey.json"
INSPECTION_DATASET_NAME = "inspection.json"
PARCEL_TYPE = "SpatialUnit"
PARCEL_RECORD_FIELD = "record"
PARCEL_FABRIC_PATH = "Parcel/ParcelFabric"
PARCEL_DATASET = "Parcel"
REFERENCE_OBJECTS_DATASET = "ReferenceObjects"
INSPECTION_MAP = "Inspection"
LAYERFILES_RELATIVE_PATH = "layers"
PARCEL_SCHEMA_PATH = "schemas/parcel.yaml"
LADM_SCHEMA_PATH = "schemas/ladm.yaml"
SIGNATURE_CAPTURE_TOOL_RELATIVE_PATH = "bin/capture"
SIGNATURE_CAPTURE_TOOL_FILE_PATH_COMMAND = "-f"
SIGNATURE_CAPTURE_TOOL_PARTY_NAME_COMMAND = "-n"
SIGNATURES_RELATIVE_PATH = "signatures"
PERMANENT_CLASS_MARKER = "publicinspection"
"#;

    #[test]
    fn settings_resolve_against_project_folder() {
        let config = Configuration::from_toml_str(TOML).unwrap();
        let settings = InspectionSettings::resolve(&config, "/projects/town").unwrap();
        assert_eq!(settings.inspection_dataset, PathBuf::from("/projects/town/inspection.json"));
        assert_eq!(settings.scratch_dataset, PathBuf::from("/projects/town/scratch.json"));
        assert_eq!(settings.ladm_schema, PathBuf::from("/projects/town/schemas/ladm.yaml"));
        assert_eq!(settings.inspection_map_path(), PathBuf::from("/projects/town/Inspection.map.json"));
        assert_eq!(settings.model, InspectionModel::default());
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let config = Configuration::from_toml_str("SURVEY_DATASET_NAME = \"survey.json\"").unwrap();
        let err = InspectionSettings::resolve(&config, ".").unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(k) if k == "INSPECTION_DATASET_NAME"));
    }

    #[test]
    fn blank_value_is_invalid() {
        let config = Configuration::new().with("PARCEL_TYPE", "  ");
        assert!(matches!(
            config.require("PARCEL_TYPE"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn json_and_yaml_accept_scalars() {
        let json = Configuration::from_json_str(r#"{"PARCEL_TYPE": "SpatialUnit", "RETRIES": 3}"#).unwrap();
        assert_eq!(json.get("RETRIES"), Some("3"));
        let yaml = Configuration::from_yaml_str("PARCEL_TYPE: SpatialUnit\nVERBOSE: true\n").unwrap();
        assert_eq!(yaml.get("VERBOSE"), Some("true"));
        assert_eq!(yaml.get("PARCEL_TYPE"), json.get("PARCEL_TYPE"));
    }

    #[test]
    fn model_names_can_be_overridden() {
        let config = Configuration::new()
            .with("APPROVAL_NAME", "Approval")
            .with("APPROVAL_FK_FIELD", "approval_id");
        let model = model_from_config(&config);
        assert_eq!(model.approval.class, "Approval");
        assert_eq!(model.approval_signature.approval_fk, "approval_id");
        assert_eq!(model.boundary, InspectionModel::default().boundary);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(
            Configuration::from_path(&path),
            Err(ConfigError::UnknownFormat(_))
        ));
    }
}
