//! Recalculation of every boundary state

use crate::config::InspectionSettings;
use crate::error::Result;
use pi_consensus::{BoundaryReport, ConsensusEngine};
use pi_data::InMemoryDataset;

#[derive(Debug, Clone)]
pub struct CalculateBoundaries {
    settings: InspectionSettings,
}

impl CalculateBoundaries {
    #[inline]
    #[must_use]
    pub fn new(settings: InspectionSettings) -> Self {
        Self { settings }
    }

    /// Re-derive all boundaries of the inspection dataset and save it
    ///
    /// # Errors
    /// Returns error if the dataset cannot be read or saved
    pub fn execute(&self) -> Result<BoundaryReport> {
        let path = &self.settings.inspection_dataset;
        let mut inspection = InMemoryDataset::load(path)?;
        let report = ConsensusEngine::new(self.settings.model.clone()).recalculate_all(&mut inspection)?;
        inspection.save(path)?;
        Ok(report)
    }
}
