//! Approval consensus engine
//!
//! Records per-approval decisions and derives the aggregate state of each
//! boundary from the full, current approval set for that boundary.
//!
//! # Failure policy
//! Reads that feed a derivation are structural: a failed read aborts the
//! operation. Writes are per row: a failed approval or boundary update is
//! logged and the remaining rows are still processed.

use crate::error::ConsensusError;
use crate::model::{ApprovalRef, ApprovalState, BoundaryState, InspectionModel, NeighborDecision};
use chrono::Utc;
use pi_data::{DataAccess, Filter, Value};
use uuid::Uuid;

/// Derive a boundary state from its approvals
///
/// Rules are applied in order, first match wins:
/// 1. all `No Processed` (including no approvals at all) → `No Processed`
/// 2. all `Yes` → `Approved`
/// 3. any `No` → `Rejected`
/// 4. otherwise → `In Process`
#[must_use]
pub fn derive_state(approvals: &[ApprovalState]) -> BoundaryState {
    if approvals.iter().all(|s| *s == ApprovalState::NoProcessed) {
        BoundaryState::NoProcessed
    } else if approvals.iter().all(|s| *s == ApprovalState::Yes) {
        BoundaryState::Approved
    } else if approvals.iter().any(|s| *s == ApprovalState::No) {
        BoundaryState::Rejected
    } else {
        BoundaryState::InProcess
    }
}

/// Decision applied to an approval, `Yes` unless an explicit one was given
#[must_use]
pub fn resolve_decision(approval_id: Uuid, neighbors: &[NeighborDecision]) -> ApprovalState {
    neighbors
        .iter()
        .find(|n| n.approval_id == approval_id)
        .map_or(ApprovalState::Yes, |n| n.is_approved)
}

/// Result of [`ConsensusEngine::record_approval_decisions`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionReport {
    /// Approvals written, with the decision applied
    pub updated: Vec<(Uuid, ApprovalState)>,
    /// Approvals whose write failed or matched no row
    pub failed: Vec<Uuid>,
}

/// Derived state of one boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryOutcome {
    pub boundary_id: Uuid,
    /// Stored state before derivation, if readable
    pub previous: Option<BoundaryState>,
    pub state: BoundaryState,
}

/// Result of a boundary derivation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryReport {
    /// Boundaries whose derived state was persisted
    pub updated: Vec<BoundaryOutcome>,
    /// Boundaries whose write failed
    pub failed: Vec<Uuid>,
}

impl BoundaryReport {
    /// Persisted state of a boundary, if it was updated
    #[must_use]
    pub fn state_of(&self, boundary_id: Uuid) -> Option<BoundaryState> {
        self.updated
            .iter()
            .find(|o| o.boundary_id == boundary_id)
            .map(|o| o.state)
    }
}

/// Consensus engine over an inspection dataset
#[derive(Debug, Clone, Default)]
pub struct ConsensusEngine {
    model: InspectionModel,
}

impl ConsensusEngine {
    #[inline]
    #[must_use]
    pub fn new(model: InspectionModel) -> Self {
        Self { model }
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &InspectionModel {
        &self.model
    }

    /// Apply decisions to every approval in `approvals` and stamp the date
    ///
    /// An approval with no matching neighbor decision is recorded as `Yes`.
    /// Each approval is written in a single update; failures are logged and
    /// do not stop the batch.
    pub fn record_approval_decisions<D: DataAccess + ?Sized>(
        &self,
        store: &mut D,
        approvals: &[ApprovalRef],
        neighbors: &[NeighborDecision],
    ) -> DecisionReport {
        let names = &self.model.approval;
        let mut report = DecisionReport::default();
        tracing::info!(count = approvals.len(), "updating approvals");

        for approval in approvals {
            let decision = resolve_decision(approval.id, neighbors);
            let result = store.update(
                &names.class,
                &[names.is_approved.as_str(), names.date.as_str()],
                &[
                    Value::Text(decision.as_str().to_string()),
                    Value::Date(Utc::now()),
                ],
                &Filter::eq(names.id.as_str(), approval.id),
            );
            match result {
                Ok(0) => {
                    tracing::error!(approval = %approval.id, "approval not found");
                    report.failed.push(approval.id);
                }
                Ok(_) => {
                    tracing::debug!(approval = %approval.id, decision = %decision, "approval updated");
                    report.updated.push((approval.id, decision));
                }
                Err(e) => {
                    tracing::error!(approval = %approval.id, error = %e, "error updating approval");
                    report.failed.push(approval.id);
                }
            }
        }

        tracing::info!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "approvals updated"
        );
        report
    }

    /// Re-derive every boundary referenced by `approvals`
    ///
    /// The full approval set of each boundary is re-read from storage; the
    /// batch only selects which boundaries to derive.
    ///
    /// # Errors
    /// Returns error if approvals or boundaries cannot be read
    pub fn derive_boundary_states<D: DataAccess + ?Sized>(
        &self,
        store: &mut D,
        approvals: &[ApprovalRef],
    ) -> Result<BoundaryReport, ConsensusError> {
        let mut boundary_ids: Vec<Uuid> = Vec::new();
        for approval in approvals {
            if !boundary_ids.contains(&approval.boundary_fk) {
                boundary_ids.push(approval.boundary_fk);
            }
        }
        self.derive_for(store, &boundary_ids)
    }

    /// Re-derive every boundary in the dataset
    ///
    /// # Errors
    /// Returns error if approvals or boundaries cannot be read
    pub fn recalculate_all<D: DataAccess + ?Sized>(
        &self,
        store: &mut D,
    ) -> Result<BoundaryReport, ConsensusError> {
        let names = &self.model.boundary;
        let rows = store.search(&names.class, Some(&[names.id.as_str()]), None)?;
        let ids: Vec<Uuid> = rows.iter().filter_map(|r| r.guid(&names.id)).collect();
        tracing::info!(boundaries = ids.len(), "recalculating all boundaries");
        self.derive_for(store, &ids)
    }

    fn derive_for<D: DataAccess + ?Sized>(
        &self,
        store: &mut D,
        boundary_ids: &[Uuid],
    ) -> Result<BoundaryReport, ConsensusError> {
        let mut report = BoundaryReport::default();
        if boundary_ids.is_empty() {
            return Ok(report);
        }

        let approval = &self.model.approval;
        let boundary = &self.model.boundary;
        tracing::info!(count = boundary_ids.len(), "updating boundaries");

        let approval_rows = store.search(
            &approval.class,
            Some(&[approval.is_approved.as_str(), approval.boundary_fk.as_str()]),
            Some(&Filter::in_values(approval.boundary_fk.as_str(), boundary_ids.iter().copied())),
        )?;
        let boundary_rows = store.search(
            &boundary.class,
            Some(&[boundary.id.as_str(), boundary.state.as_str()]),
            Some(&Filter::in_values(boundary.id.as_str(), boundary_ids.iter().copied())),
        )?;

        for row in boundary_rows {
            let Some(boundary_id) = row.guid(&boundary.id) else {
                tracing::warn!(class = %boundary.class, "boundary without identifier skipped");
                continue;
            };
            let key = Value::Guid(boundary_id);
            let states: Vec<ApprovalState> = approval_rows
                .iter()
                .filter(|a| a.value(&approval.boundary_fk).matches(&key))
                .map(|a| self.read_approval_state(a.text(&approval.is_approved)))
                .collect();
            let state = derive_state(&states);
            let previous = row.text(&boundary.state).and_then(|s| s.parse().ok());

            let result = store.update(
                &boundary.class,
                &[boundary.state.as_str()],
                &[Value::Text(state.as_str().to_string())],
                &Filter::eq(boundary.id.as_str(), boundary_id),
            );
            match result {
                Ok(_) => {
                    tracing::debug!(boundary = %boundary_id, state = %state, approvals = states.len(), "boundary derived");
                    report.updated.push(BoundaryOutcome {
                        boundary_id,
                        previous,
                        state,
                    });
                }
                Err(e) => {
                    tracing::error!(boundary = %boundary_id, error = %e, "error updating boundary");
                    report.failed.push(boundary_id);
                }
            }
        }

        tracing::info!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "boundaries updated"
        );
        Ok(report)
    }

    fn read_approval_state(&self, text: Option<&str>) -> ApprovalState {
        match text.map(str::parse::<ApprovalState>) {
            Some(Ok(state)) => state,
            Some(Err(e)) => {
                tracing::warn!(class = %self.model.approval.class, error = %e, "treating as No Processed");
                ApprovalState::NoProcessed
            }
            None => ApprovalState::NoProcessed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ApprovalState::{No, NoProcessed, Yes};

    #[test]
    fn documented_examples() {
        assert_eq!(derive_state(&[NoProcessed, NoProcessed]), BoundaryState::NoProcessed);
        assert_eq!(derive_state(&[Yes, Yes]), BoundaryState::Approved);
        assert_eq!(derive_state(&[Yes, No]), BoundaryState::Rejected);
        assert_eq!(derive_state(&[Yes, NoProcessed]), BoundaryState::InProcess);
    }

    #[test]
    fn no_approvals_is_not_processed() {
        assert_eq!(derive_state(&[]), BoundaryState::NoProcessed);
    }

    #[test]
    fn rejection_beats_in_process() {
        assert_eq!(derive_state(&[No, NoProcessed]), BoundaryState::Rejected);
        assert_eq!(derive_state(&[No, NoProcessed, Yes]), BoundaryState::Rejected);
    }

    #[test]
    fn decision_defaults_to_yes() {
        let id = Uuid::new_v4();
        assert_eq!(resolve_decision(id, &[]), Yes);
        let other = NeighborDecision::new(Uuid::new_v4(), No);
        assert_eq!(resolve_decision(id, &[other]), Yes);
        assert_eq!(resolve_decision(id, &[other, NeighborDecision::new(id, No)]), No);
    }

    fn any_state() -> impl Strategy<Value = ApprovalState> {
        prop_oneof![Just(NoProcessed), Just(Yes), Just(No)]
    }

    proptest! {
        #[test]
        fn prop_state_follows_rule_order(states in proptest::collection::vec(any_state(), 0..8)) {
            let derived = derive_state(&states);
            let expected = if states.iter().all(|s| *s == NoProcessed) {
                BoundaryState::NoProcessed
            } else if states.iter().all(|s| *s == Yes) {
                BoundaryState::Approved
            } else if states.contains(&No) {
                BoundaryState::Rejected
            } else {
                BoundaryState::InProcess
            };
            prop_assert_eq!(derived, expected);
        }

        #[test]
        fn prop_order_does_not_matter(mut states in proptest::collection::vec(any_state(), 0..8)) {
            let before = derive_state(&states);
            states.reverse();
            prop_assert_eq!(derive_state(&states), before);
        }
    }
}
