//! Signature intake workflow
//!
//! Captures a party's signature and attaches it to every approval the party
//! holds on the spatial unit, then records the party's decisions and
//! re-derives the affected boundaries.
//!
//! # Failure policy
//! The workflow is a sequence of committed steps, not a transaction. Selection
//! reset and removal of earlier attachments are best effort. Any other failure
//! stops the workflow and is returned; steps already committed stay committed.

use crate::capture::{fingerprint_file_name, signature_file_name, SignatureCapture};
use crate::error::IntakeError;
use crate::match_table::MatchTable;
use crate::queries::{InspectionQueries, NeighborApproval, Party, SpatialUnit};
use pi_consensus::{
    ApprovalRef, ApprovalState, BoundaryReport, ConsensusEngine, DecisionReport, InspectionModel,
    NeighborDecision,
};
use pi_data::{
    attachment_table_name, AttachmentStore, DataAccess, Dataset, Filter, Value, ATTACH_NAME_FIELD,
    ATTACH_REL_FIELD,
};
use uuid::Uuid;

/// A view whose selection is cleared before capture
pub trait SelectionView {
    fn name(&self) -> &str;

    /// Drop the current selection
    ///
    /// # Errors
    /// Returns error if the view rejects the reset
    fn clear_selection(&mut self) -> Result<(), IntakeError>;
}

/// Everything one intake needs, passed explicitly
#[derive(Debug, Clone, Default)]
pub struct IntakeRequest {
    pub spatial_unit: Option<SpatialUnit>,
    pub party: Option<Party>,
    /// Boundaries of the unit with the decisions to record
    pub neighbors: Vec<NeighborApproval>,
}

/// How an intake ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// A precondition was not met; nothing was changed
    Skipped(String),
    /// No signature was produced
    Declined,
    /// Images attached and decisions recorded
    Attached {
        approvals: DecisionReport,
        images: usize,
        boundaries: BoundaryReport,
    },
}

/// Signature intake over an inspection dataset
pub struct SignatureIntake {
    model: InspectionModel,
    engine: ConsensusEngine,
    queries: InspectionQueries,
    capture: Box<dyn SignatureCapture>,
    views: Vec<Box<dyn SelectionView>>,
}

impl std::fmt::Debug for SignatureIntake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureIntake")
            .field("model", &self.model)
            .field("views", &self.views.len())
            .finish_non_exhaustive()
    }
}

impl SignatureIntake {
    #[must_use]
    pub fn new(model: InspectionModel, capture: impl SignatureCapture + 'static) -> Self {
        Self {
            engine: ConsensusEngine::new(model.clone()),
            queries: InspectionQueries::new(model.clone()),
            model,
            capture: Box::new(capture),
            views: Vec::new(),
        }
    }

    /// Add a view to reset before each capture
    #[must_use]
    pub fn with_view(mut self, view: impl SelectionView + 'static) -> Self {
        self.views.push(Box::new(view));
        self
    }

    #[inline]
    #[must_use]
    pub fn queries(&self) -> &InspectionQueries {
        &self.queries
    }

    /// Capture a signature and attach it to the party's approvals
    ///
    /// `store` holds the inspection data; `scratch` holds the match table.
    ///
    /// # Errors
    /// Returns error if a committed step fails; earlier steps are not undone
    pub fn capture_and_attach<S, M>(
        &mut self,
        store: &mut S,
        scratch: &mut M,
        request: &IntakeRequest,
    ) -> Result<IntakeOutcome, IntakeError>
    where
        S: DataAccess + AttachmentStore + ?Sized,
        M: Dataset,
    {
        let Some(unit) = &request.spatial_unit else {
            tracing::warn!("no spatial unit selected");
            return Ok(IntakeOutcome::Skipped("no spatial unit selected".into()));
        };
        let Some(party) = &request.party else {
            tracing::warn!("no party selected");
            return Ok(IntakeOutcome::Skipped("no party selected".into()));
        };
        if request.neighbors.is_empty() {
            tracing::warn!("no neighbors selected");
            return Ok(IntakeOutcome::Skipped("no neighbors selected".into()));
        }

        self.reset_selection();

        tracing::info!(party = %party.id, unit = %unit.legal_id, "capturing signature");
        let Some(images) = self.capture.capture(party.id, &party.name)? else {
            tracing::info!(party = %party.id, "signature declined");
            return Ok(IntakeOutcome::Declined);
        };

        let match_table = MatchTable::prepare(scratch)?;

        let mut approvals = self.party_approvals(&*store, unit, party)?;
        if approvals.is_empty() {
            self.create_approvals(store, unit)?;
            approvals = self.party_approvals(&*store, unit, party)?;
        }
        let signatures = self.ensure_signatures(store, &approvals)?;

        self.remove_previous_images(store, party.id, &signatures);

        for signature in &signatures {
            for path in images.paths() {
                match_table.stage(scratch, *signature, path)?;
            }
        }
        let images_attached = store.add_attachments(
            &self.model.approval_signature.class,
            &self.model.approval_signature.id,
            &*scratch,
            &match_table.spec(),
        )?;
        tracing::info!(images = images_attached, signatures = signatures.len(), "images attached");

        let decisions = decisions_for(&approvals, &request.neighbors);
        let approvals_report = self
            .engine
            .record_approval_decisions(store, &approvals, &decisions);
        let boundaries = self.engine.derive_boundary_states(store, &approvals)?;

        Ok(IntakeOutcome::Attached {
            approvals: approvals_report,
            images: images_attached,
            boundaries,
        })
    }

    fn reset_selection(&mut self) {
        for view in &mut self.views {
            if let Err(e) = view.clear_selection() {
                tracing::debug!(view = view.name(), error = %e, "selection reset ignored");
            }
        }
    }

    /// The party's approvals on boundaries of this unit
    fn party_approvals<S: DataAccess + ?Sized>(
        &self,
        store: &S,
        unit: &SpatialUnit,
        party: &Party,
    ) -> Result<Vec<ApprovalRef>, IntakeError> {
        let names = &self.model.approval;
        let boundaries = self.queries.boundaries_of(store, unit)?;
        let filter = Filter::eq(names.party_fk.as_str(), party.id).and(Filter::in_values(
            names.boundary_fk.as_str(),
            boundaries,
        ));
        let rows = store.search(
            &names.class,
            Some(&[
                names.id.as_str(),
                names.party_fk.as_str(),
                names.boundary_fk.as_str(),
            ]),
            Some(&filter),
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(ApprovalRef {
                    id: r.guid(&names.id)?,
                    party_fk: r.guid(&names.party_fk)?,
                    boundary_fk: r.guid(&names.boundary_fk)?,
                })
            })
            .collect())
    }

    /// One `No Processed` approval per (party, boundary) pair of the unit
    fn create_approvals<S: DataAccess + ?Sized>(
        &self,
        store: &mut S,
        unit: &SpatialUnit,
    ) -> Result<usize, IntakeError> {
        let names = &self.model.approval;
        let parties = self.queries.parties_by_spatial_unit(&*store, unit)?;
        let boundaries = self.queries.boundaries_of(&*store, unit)?;
        let existing = store.search(
            &names.class,
            Some(&[names.party_fk.as_str(), names.boundary_fk.as_str()]),
            Some(&Filter::in_values(names.boundary_fk.as_str(), boundaries.iter().copied())),
        )?;

        let mut tuples = Vec::new();
        for party in &parties {
            for boundary in &boundaries {
                let present = existing.iter().any(|r| {
                    r.guid(&names.party_fk) == Some(party.id)
                        && r.guid(&names.boundary_fk) == Some(*boundary)
                });
                if !present {
                    tuples.push(vec![
                        Value::Guid(Uuid::new_v4()),
                        Value::Guid(party.id),
                        Value::Guid(*boundary),
                        Value::Text(ApprovalState::NoProcessed.as_str().to_string()),
                    ]);
                }
            }
        }

        let created = store
            .insert(
                &names.class,
                &[
                    names.id.as_str(),
                    names.party_fk.as_str(),
                    names.boundary_fk.as_str(),
                    names.is_approved.as_str(),
                ],
                tuples,
            )?
            .len();
        tracing::info!(unit = %unit.legal_id, approvals = created, "approvals created");
        Ok(created)
    }

    /// Signature row ids for `approvals`, creating the missing rows
    fn ensure_signatures<S: DataAccess + ?Sized>(
        &self,
        store: &mut S,
        approvals: &[ApprovalRef],
    ) -> Result<Vec<Uuid>, IntakeError> {
        let names = &self.model.approval_signature;
        let ids: Vec<Uuid> = approvals.iter().map(|a| a.id).collect();
        let rows = store.search(
            &names.class,
            Some(&[names.id.as_str(), names.approval_fk.as_str()]),
            Some(&Filter::in_values(names.approval_fk.as_str(), ids.iter().copied())),
        )?;

        let missing: Vec<Vec<Value>> = ids
            .iter()
            .filter(|id| !rows.iter().any(|r| r.guid(&names.approval_fk) == Some(**id)))
            .map(|id| vec![Value::Guid(Uuid::new_v4()), Value::Guid(*id)])
            .collect();
        let mut signatures: Vec<Uuid> = rows.iter().filter_map(|r| r.guid(&names.id)).collect();
        if !missing.is_empty() {
            signatures.extend(missing.iter().filter_map(|t| t[0].as_guid()));
            store.insert(
                &names.class,
                &[names.id.as_str(), names.approval_fk.as_str()],
                missing,
            )?;
        }
        Ok(signatures)
    }

    fn remove_previous_images<S: DataAccess + ?Sized>(
        &self,
        store: &mut S,
        party_id: Uuid,
        signatures: &[Uuid],
    ) {
        let attach_table = attachment_table_name(&self.model.approval_signature.class);
        let filter = Filter::in_values(
            ATTACH_NAME_FIELD,
            [signature_file_name(party_id), fingerprint_file_name(party_id)],
        )
        .and(Filter::in_values(ATTACH_REL_FIELD, signatures.iter().copied()));
        match store.delete(&attach_table, &filter) {
            Ok(removed) => tracing::debug!(party = %party_id, removed, "previous images removed"),
            Err(e) => tracing::warn!(party = %party_id, error = %e, "cannot remove previous images"),
        }
    }
}

/// Neighbor decisions keyed by the approval they apply to
fn decisions_for(approvals: &[ApprovalRef], neighbors: &[NeighborApproval]) -> Vec<NeighborDecision> {
    approvals
        .iter()
        .filter_map(|a| {
            neighbors
                .iter()
                .find(|n| n.boundary_id == a.boundary_fk)
                .map(|n| NeighborDecision::new(a.id, n.proposed))
        })
        .collect()
}
