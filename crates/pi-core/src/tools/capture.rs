//! Signature capture for one party of a spatial unit

use crate::config::InspectionSettings;
use crate::error::Result;
use pi_consensus::ApprovalState;
use pi_data::InMemoryDataset;
use pi_signature::{
    apply_table_decisions, InspectionQueries, IntakeOutcome, IntakeRequest, ProcessSignatureCapture,
    SignatureCapture, SignatureIntake,
};
use std::path::Path;

/// Capture a party's signature and record the party's boundary decisions
#[derive(Debug, Clone)]
pub struct CaptureSignatures {
    settings: InspectionSettings,
}

impl CaptureSignatures {
    #[inline]
    #[must_use]
    pub fn new(settings: InspectionSettings) -> Self {
        Self { settings }
    }

    /// Capture device program configured for the project
    #[must_use]
    pub fn process_capture(&self) -> ProcessSignatureCapture {
        ProcessSignatureCapture::new(
            &self.settings.signature_tool,
            &self.settings.signature_file_option,
            &self.settings.signature_name_option,
            &self.settings.signatures_dir,
        )
    }

    /// Run the intake with the configured capture program
    ///
    /// # Errors
    /// See [`CaptureSignatures::execute_with`]
    pub fn execute(
        &self,
        legal_id: &str,
        party_name: &str,
        decisions: &[(String, ApprovalState)],
    ) -> Result<IntakeOutcome> {
        self.execute_with(self.process_capture(), legal_id, party_name, decisions)
    }

    /// Run the intake for `party_name` on the unit `legal_id`
    ///
    /// `decisions` are `(neighbor label, decision)` rows; every other
    /// boundary keeps its proposed decision.
    ///
    /// # Errors
    /// Returns error if the datasets cannot be read or saved, or if a
    /// committed intake step fails. Steps applied before the failing one
    /// are saved before the error is returned.
    pub fn execute_with(
        &self,
        capture: impl SignatureCapture + 'static,
        legal_id: &str,
        party_name: &str,
        decisions: &[(String, ApprovalState)],
    ) -> Result<IntakeOutcome> {
        let settings = &self.settings;
        let mut inspection = InMemoryDataset::load(&settings.inspection_dataset)?;
        let mut scratch = open_scratch(&settings.scratch_dataset)?;
        let queries = InspectionQueries::new(settings.model.clone());

        let spatial_unit = queries.spatial_unit_by_legal_id(&inspection, legal_id)?;
        let party = match &spatial_unit {
            Some(unit) => queries
                .parties_by_spatial_unit(&inspection, unit)?
                .into_iter()
                .find(|p| p.name == party_name),
            None => None,
        };
        let mut neighbors = match (&spatial_unit, &party) {
            (Some(unit), Some(party)) => queries.neighboring_approvals(&inspection, unit, party)?,
            _ => {
                tracing::warn!(legal_id, party = party_name, "no spatial unit or party found");
                Vec::new()
            }
        };
        let changed = apply_table_decisions(&mut neighbors, decisions);
        tracing::debug!(changed, "neighbor decisions applied");

        let request = IntakeRequest {
            spatial_unit,
            party,
            neighbors,
        };
        let mut intake = SignatureIntake::new(settings.model.clone(), capture);
        let outcome = match intake.capture_and_attach(&mut inspection, &mut scratch, &request) {
            Ok(outcome) => outcome,
            Err(e) => {
                // steps applied before the failure stay committed
                tracing::error!(legal_id, party = party_name, error = %e, "signature intake failed");
                if let Err(save) = self.save(&inspection, &scratch) {
                    tracing::error!(error = %save, "cannot save partial intake");
                }
                return Err(e.into());
            }
        };

        if matches!(outcome, IntakeOutcome::Attached { .. }) {
            self.save(&inspection, &scratch)?;
        }
        Ok(outcome)
    }

    fn save(&self, inspection: &InMemoryDataset, scratch: &InMemoryDataset) -> Result<()> {
        inspection.save(&self.settings.inspection_dataset)?;
        scratch.save(&self.settings.scratch_dataset)?;
        Ok(())
    }
}

fn open_scratch(path: &Path) -> Result<InMemoryDataset> {
    if path.exists() {
        return Ok(InMemoryDataset::load(path)?);
    }
    Ok(InMemoryDataset::new("scratch"))
}
