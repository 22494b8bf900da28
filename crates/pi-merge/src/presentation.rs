//! Presentation map refresh
//!
//! After a merge the inspection map is rebuilt from the merged dataset. The
//! host project is reached through [`MapDocument`]; [`ProjectMap`] is a
//! JSON-persisted implementation.

use crate::error::MergeError;
use crate::fabric::RETIRED_BY_RECORD_FIELD;
use pi_data::{ClassKind, Dataset, Envelope, SHAPE_FIELD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Factor applied to the union of layer extents before zooming
pub const EXTENT_EXPANSION: f64 = 1.2;

/// A layer of the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayer {
    pub name: String,
    /// Table path of the backing class
    pub data_source: String,
    #[serde(default)]
    pub definition_query: Option<String>,
    pub visible: bool,
    #[serde(default)]
    pub is_basemap: bool,
    /// Layer file the symbology was taken from
    #[serde(default)]
    pub symbology: Option<PathBuf>,
    #[serde(default)]
    pub extent: Option<Envelope>,
}

impl MapLayer {
    #[must_use]
    pub fn new(name: impl Into<String>, data_source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_source: data_source.into(),
            definition_query: None,
            visible: true,
            is_basemap: false,
            symbology: None,
            extent: None,
        }
    }

    #[must_use]
    pub fn basemap(name: impl Into<String>) -> Self {
        Self {
            is_basemap: true,
            ..Self::new(name, "")
        }
    }

    #[must_use]
    pub fn with_extent(mut self, extent: Envelope) -> Self {
        self.extent = Some(extent);
        self
    }
}

/// A standalone table of the map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapTable {
    pub name: String,
    pub data_source: String,
}

/// Host map operations used by the refresh
pub trait MapDocument {
    fn layers(&self) -> &[MapLayer];
    fn layers_mut(&mut self) -> &mut Vec<MapLayer>;
    fn tables(&self) -> &[MapTable];
    fn add_table(&mut self, table: MapTable);
    fn remove_table(&mut self, name: &str) -> bool;
    fn set_extent(&mut self, extent: Envelope);
    fn save(&mut self) -> Result<(), MergeError>;

    fn add_layer(&mut self, layer: MapLayer) {
        self.layers_mut().push(layer);
    }

    fn remove_layer(&mut self, name: &str) -> bool {
        let layers = self.layers_mut();
        let before = layers.len();
        layers.retain(|l| !l.name.eq_ignore_ascii_case(name));
        layers.len() != before
    }

    /// Position of a layer by case-insensitive name
    fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers()
            .iter()
            .position(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// Move layer `name` directly before layer `target`
    fn move_layer_before(&mut self, name: &str, target: &str) -> Result<(), MergeError> {
        let from = self
            .layer_index(name)
            .ok_or_else(|| MergeError::MapElementNotFound(name.to_string()))?;
        if self.layer_index(target).is_none() {
            return Err(MergeError::MapElementNotFound(target.to_string()));
        }
        let layer = self.layers_mut().remove(from);
        let to = self
            .layer_index(target)
            .ok_or_else(|| MergeError::MapElementNotFound(target.to_string()))?;
        self.layers_mut().insert(to, layer);
        Ok(())
    }
}

/// Map persisted as a JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMap {
    pub name: String,
    #[serde(default)]
    pub layers: Vec<MapLayer>,
    #[serde(default)]
    pub tables: Vec<MapTable>,
    #[serde(default)]
    pub extent: Option<Envelope>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl ProjectMap {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Save target for [`MapDocument::save`]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Open a map document, or start an empty one named `name` if absent
    ///
    /// # Errors
    /// Returns error if an existing document cannot be read
    pub fn open(path: impl AsRef<Path>, name: &str) -> Result<Self, MergeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new(name).with_path(path));
        }
        let text = std::fs::read_to_string(path).map_err(|e| MergeError::io_error(path, e))?;
        let map: Self = serde_json::from_str(&text)?;
        Ok(map.with_path(path))
    }

    #[must_use]
    pub fn layer(&self, name: &str) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.name.eq_ignore_ascii_case(name))
    }
}

impl MapDocument for ProjectMap {
    fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    fn layers_mut(&mut self) -> &mut Vec<MapLayer> {
        &mut self.layers
    }

    fn tables(&self) -> &[MapTable] {
        &self.tables
    }

    fn add_table(&mut self, table: MapTable) {
        self.tables.push(table);
    }

    fn remove_table(&mut self, name: &str) -> bool {
        let before = self.tables.len();
        self.tables.retain(|t| !t.name.eq_ignore_ascii_case(name));
        self.tables.len() != before
    }

    fn set_extent(&mut self, extent: Envelope) {
        self.extent = Some(extent);
    }

    fn save(&mut self) -> Result<(), MergeError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| MergeError::io_error(parent, e))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|e| MergeError::io_error(path, e))
    }
}

/// Names the refresh needs
#[derive(Debug, Clone)]
pub struct MapSettings {
    pub parcel_dataset: String,
    pub reference_objects_dataset: String,
    pub spatial_unit_layer: String,
    pub boundary_layer: String,
    /// Folder holding `<layer>.lyrx` files
    pub layer_files: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapSummary {
    pub layers: usize,
    pub tables: usize,
    pub historic_layers: usize,
    pub styled_layers: usize,
    pub extent: Option<Envelope>,
    pub saved: bool,
}

/// Remove every non-basemap layer and every table
pub fn clean_inspection_map(map: &mut dyn MapDocument) {
    map.layers_mut().retain(|l| l.is_basemap);
    let tables: Vec<String> = map.tables().iter().map(|t| t.name.clone()).collect();
    for table in tables {
        map.remove_table(&table);
    }
    tracing::info!("inspection map cleaned");
}

/// Scale `extent` around its center
#[must_use]
pub fn expand_extent(extent: &Envelope, factor: f64) -> Envelope {
    extent.expand(factor)
}

fn class_extent(dataset: &dyn Dataset, class: &str) -> Option<Envelope> {
    let rows = dataset.search(class, Some(&[SHAPE_FIELD]), None).ok()?;
    rows.iter()
        .filter_map(|r| r.get(SHAPE_FIELD).and_then(pi_data::Value::as_shape).copied())
        .reduce(|a, b| a.union(&b))
}

/// Rebuild the inspection map from `dataset`
///
/// Save failures are logged and reported through [`MapSummary::saved`].
///
/// # Errors
/// Returns error if the dataset cannot be read
pub fn refresh_inspection_map(
    map: &mut dyn MapDocument,
    dataset: &dyn Dataset,
    settings: &MapSettings,
) -> Result<MapSummary, MergeError> {
    let mut summary = MapSummary::default();

    for sub in [&settings.reference_objects_dataset, &settings.parcel_dataset] {
        let classes: Vec<String> = dataset
            .schema()
            .classes_of(ClassKind::FeatureClass)
            .filter(|c| c.dataset.as_deref().is_some_and(|d| d.eq_ignore_ascii_case(sub)))
            .map(|c| c.name.clone())
            .collect();
        for class in classes {
            let source = dataset.find_table_path(&class)?;
            let mut layer = MapLayer::new(&class, source);
            layer.extent = class_extent(dataset, &class);
            map.add_layer(layer);
        }
    }

    let tables: Vec<String> = dataset
        .schema()
        .classes_of(ClassKind::Table)
        .filter(|c| !c.is_attachment_table())
        .map(|c| c.name.clone())
        .collect();
    for table in tables {
        let data_source = dataset.find_table_path(&table)?;
        map.add_table(MapTable {
            name: table,
            data_source,
        });
    }

    if map.layer_index(&settings.spatial_unit_layer).is_some() && map.layer_index(&settings.boundary_layer).is_some() {
        map.move_layer_before(&settings.spatial_unit_layer, &settings.boundary_layer)?;
    }

    let names: Vec<String> = map
        .layers()
        .iter()
        .filter(|l| !l.is_basemap)
        .map(|l| l.name.clone())
        .collect();
    let mut full_extent: Option<Envelope> = None;

    for name in names {
        let Some(index) = map.layer_index(&name) else {
            continue;
        };
        let retired = dataset
            .class_def(&name)
            .is_some_and(|c| c.has_field(RETIRED_BY_RECORD_FIELD));
        if retired {
            let current = &mut map.layers_mut()[index];
            current.definition_query = Some(format!("{RETIRED_BY_RECORD_FIELD} is null"));
            let mut historic = current.clone();
            historic.name = format!("Historic {name}");
            historic.definition_query = Some(format!("{RETIRED_BY_RECORD_FIELD} is not null"));
            historic.visible = false;
            map.layers_mut().insert(index + 1, historic);
            summary.historic_layers += 1;
        }

        let layer_file = settings.layer_files.join(format!("{name}.lyrx"));
        let styled = layer_file.exists();
        let layer = &mut map.layers_mut()[index];
        layer.visible = styled;
        if styled {
            tracing::info!(layer = %name, "applying symbology from layer file");
            layer.symbology = Some(layer_file);
            summary.styled_layers += 1;
        }
        if let Some(extent) = layer.extent.filter(|e| !e.is_empty()) {
            full_extent = Some(full_extent.map_or(extent, |f| f.union(&extent)));
        }
    }

    if let Some(extent) = full_extent {
        let expanded = expand_extent(&extent, EXTENT_EXPANSION);
        map.set_extent(expanded);
        summary.extent = Some(expanded);
    }

    summary.saved = match map.save() {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "error saving project");
            false
        }
    };
    summary.layers = map.layers().iter().filter(|l| !l.is_basemap).count();
    summary.tables = map.tables().len();
    tracing::info!(layers = summary.layers, tables = summary.tables, "inspection map updated");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clean_keeps_basemaps_only() {
        let mut map = ProjectMap::new("Inspection");
        map.add_layer(MapLayer::basemap("Topographic"));
        map.add_layer(MapLayer::new("SpatialUnit", "x/SpatialUnit"));
        map.add_table(MapTable {
            name: "Party".into(),
            data_source: "x/Party".into(),
        });

        clean_inspection_map(&mut map);

        assert_eq!(map.layers.len(), 1);
        assert!(map.layers[0].is_basemap);
        assert!(map.tables.is_empty());
    }

    #[test]
    fn move_before_reorders() {
        let mut map = ProjectMap::new("m");
        map.add_layer(MapLayer::new("Boundary", "b"));
        map.add_layer(MapLayer::new("Point", "p"));
        map.add_layer(MapLayer::new("SpatialUnit", "s"));

        map.move_layer_before("spatialunit", "boundary").unwrap();

        let names: Vec<&str> = map.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["SpatialUnit", "Boundary", "Point"]);
        assert!(map.move_layer_before("nope", "Boundary").is_err());
    }

    #[test]
    fn open_missing_document_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps/inspection.json");
        let mut map = ProjectMap::open(&path, "Inspection").unwrap();
        assert_eq!(map.name, "Inspection");
        map.add_layer(MapLayer::new("Boundary", "b"));
        map.save().unwrap();

        let reopened = ProjectMap::open(&path, "ignored").unwrap();
        assert_eq!(reopened.name, "Inspection");
        assert_eq!(reopened.layers.len(), 1);
    }
}
