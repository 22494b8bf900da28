//! Inspection lookups used to assemble an intake request

use crate::error::IntakeError;
use pi_consensus::{ApprovalState, InspectionModel};
use pi_data::{DataAccess, Filter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Spatial unit under inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialUnit {
    pub id: Uuid,
    pub legal_id: String,
}

/// Party linked to a spatial unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: Uuid,
    pub name: String,
}

/// One boundary of the unit as seen by a signing party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborApproval {
    pub boundary_id: Uuid,
    /// Party's approval on this boundary, if already created
    pub approval_id: Option<Uuid>,
    /// Neighbor label shown to the operator
    pub label: String,
    pub stored: ApprovalState,
    /// Decision to record when the party signs
    pub proposed: ApprovalState,
}

/// Override proposals from `(label, decision)` rows
///
/// Every neighbor carrying the label takes the decision; unknown labels are
/// ignored. Returns the number of neighbors changed.
pub fn apply_table_decisions(
    neighbors: &mut [NeighborApproval],
    table: &[(String, ApprovalState)],
) -> usize {
    let mut changed = 0;
    for (label, decision) in table {
        for neighbor in neighbors.iter_mut().filter(|n| n.label == *label) {
            neighbor.proposed = *decision;
            changed += 1;
        }
    }
    changed
}

/// Read-only queries over the inspection dataset
#[derive(Debug, Clone, Default)]
pub struct InspectionQueries {
    model: InspectionModel,
}

impl InspectionQueries {
    #[inline]
    #[must_use]
    pub fn new(model: InspectionModel) -> Self {
        Self { model }
    }

    /// First spatial unit with this legal id
    ///
    /// # Errors
    /// Returns error if the spatial unit class cannot be read
    pub fn spatial_unit_by_legal_id<D: DataAccess + ?Sized>(
        &self,
        store: &D,
        legal_id: &str,
    ) -> Result<Option<SpatialUnit>, IntakeError> {
        let names = &self.model.spatial_unit;
        let rows = store.search(
            &names.class,
            Some(&[names.id.as_str(), names.legal_id.as_str()]),
            Some(&Filter::eq(names.legal_id.as_str(), legal_id)),
        )?;
        Ok(rows.iter().find_map(|r| {
            r.guid(&names.id).map(|id| SpatialUnit {
                id,
                legal_id: legal_id.to_string(),
            })
        }))
    }

    /// Parties linked to a spatial unit, in storage order
    ///
    /// # Errors
    /// Returns error if the party class cannot be read
    pub fn parties_by_spatial_unit<D: DataAccess + ?Sized>(
        &self,
        store: &D,
        unit: &SpatialUnit,
    ) -> Result<Vec<Party>, IntakeError> {
        let names = &self.model.party;
        let rows = store.search(
            &names.class,
            Some(&[names.id.as_str(), names.name.as_str()]),
            Some(&Filter::eq(names.spatial_unit_fk.as_str(), unit.id)),
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(Party {
                    id: r.guid(&names.id)?,
                    name: r.text(&names.name).unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    /// Boundary ids of a spatial unit, in storage order
    ///
    /// # Errors
    /// Returns error if the boundary class cannot be read
    pub fn boundaries_of<D: DataAccess + ?Sized>(
        &self,
        store: &D,
        unit: &SpatialUnit,
    ) -> Result<Vec<Uuid>, IntakeError> {
        let names = &self.model.boundary;
        let rows = store.search(
            &names.class,
            Some(&[names.id.as_str()]),
            Some(&Filter::eq(names.spatial_unit_fk.as_str(), unit.id)),
        )?;
        Ok(rows.iter().filter_map(|r| r.guid(&names.id)).collect())
    }

    /// The unit's boundaries with the party's current decision on each
    ///
    /// A boundary the party has not decided on yet is proposed as `Yes`.
    ///
    /// # Errors
    /// Returns error if boundaries or approvals cannot be read
    pub fn neighboring_approvals<D: DataAccess + ?Sized>(
        &self,
        store: &D,
        unit: &SpatialUnit,
        party: &Party,
    ) -> Result<Vec<NeighborApproval>, IntakeError> {
        let boundary = &self.model.boundary;
        let approval = &self.model.approval;

        let boundaries = store.search(
            &boundary.class,
            Some(&[boundary.id.as_str(), boundary.neighbors.as_str()]),
            Some(&Filter::eq(boundary.spatial_unit_fk.as_str(), unit.id)),
        )?;
        let approvals = store.search(
            &approval.class,
            Some(&[
                approval.id.as_str(),
                approval.boundary_fk.as_str(),
                approval.is_approved.as_str(),
            ]),
            Some(&Filter::eq(approval.party_fk.as_str(), party.id)),
        )?;

        let mut neighbors = Vec::with_capacity(boundaries.len());
        for row in &boundaries {
            let Some(boundary_id) = row.guid(&boundary.id) else {
                continue;
            };
            let existing = approvals
                .iter()
                .find(|a| a.guid(&approval.boundary_fk) == Some(boundary_id));
            let stored = existing
                .and_then(|a| a.text(&approval.is_approved))
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let proposed = match stored {
                ApprovalState::NoProcessed => ApprovalState::Yes,
                decided => decided,
            };
            neighbors.push(NeighborApproval {
                boundary_id,
                approval_id: existing.and_then(|a| a.guid(&approval.id)),
                label: row
                    .text(&boundary.neighbors)
                    .map_or_else(|| boundary_id.to_string(), str::to_string),
                stored,
                proposed,
            });
        }
        Ok(neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pi_data::{DataAccess, Value};
    use pi_test_utils::inspection_fixture;
    use pretty_assertions::assert_eq;

    #[test]
    fn unit_and_parties_resolve_from_legal_id() {
        let fixture = inspection_fixture();
        let queries = InspectionQueries::default();
        let unit = queries
            .spatial_unit_by_legal_id(&fixture.dataset, &fixture.legal_id)
            .unwrap()
            .unwrap();
        assert_eq!(unit.id, fixture.unit);

        let names: Vec<String> = queries
            .parties_by_spatial_unit(&fixture.dataset, &unit)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Ana Perez", "Luis Gomez"]);
        assert!(queries
            .spatial_unit_by_legal_id(&fixture.dataset, "LEGAL-404")
            .unwrap()
            .is_none());
    }

    #[test]
    fn undecided_boundaries_are_proposed_as_yes() {
        let mut fixture = inspection_fixture();
        let queries = InspectionQueries::default();
        let unit = SpatialUnit {
            id: fixture.unit,
            legal_id: fixture.legal_id.clone(),
        };
        let party = Party {
            id: fixture.parties[0],
            name: "Ana Perez".into(),
        };
        let approval = Uuid::new_v4();
        fixture
            .dataset
            .insert(
                "PublicInspection_Approval",
                &["GlobalID", "party_fk", "boundary_fk", "is_approved"],
                vec![vec![
                    approval.into(),
                    party.id.into(),
                    fixture.boundaries[1].into(),
                    Value::from("No"),
                ]],
            )
            .unwrap();

        let neighbors = queries
            .neighboring_approvals(&fixture.dataset, &unit, &party)
            .unwrap();
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].label, "North - Luis Gomez");
        assert_eq!(neighbors[0].approval_id, None);
        assert_eq!(neighbors[0].proposed, ApprovalState::Yes);
        assert_eq!(neighbors[1].approval_id, Some(approval));
        assert_eq!(neighbors[1].stored, ApprovalState::No);
        assert_eq!(neighbors[1].proposed, ApprovalState::No);
    }

    #[test]
    fn table_decisions_override_by_label() {
        let mut neighbors = vec![NeighborApproval {
            boundary_id: Uuid::new_v4(),
            approval_id: None,
            label: "North".into(),
            stored: ApprovalState::NoProcessed,
            proposed: ApprovalState::Yes,
        }];
        let changed = apply_table_decisions(
            &mut neighbors,
            &[
                ("North".to_string(), ApprovalState::No),
                ("South".to_string(), ApprovalState::No),
            ],
        );
        assert_eq!(changed, 1);
        assert_eq!(neighbors[0].proposed, ApprovalState::No);
    }
}
