use pi_consensus::*;
use pi_data::{
    ClassDef, DataAccess, DatasetSchema, FieldDef, FieldType, Filter, InMemoryDataset, Value,
};
use pretty_assertions::assert_eq;
use uuid::Uuid;

fn inspection() -> InMemoryDataset {
    let schema = DatasetSchema::new("inspection")
        .with_class(
            ClassDef::table("Boundary")
                .with_field(FieldDef::guid("spatialunit_fk"))
                .with_field(FieldDef::text("state", 50))
                .with_field(FieldDef::text("neighbors", 255)),
        )
        .with_class(
            ClassDef::table("PublicInspection_Approval")
                .with_field(FieldDef::guid("party_fk"))
                .with_field(FieldDef::guid("boundary_fk"))
                .with_field(FieldDef::text("is_approved", 50))
                .with_field(FieldDef::new("approval_date", FieldType::Date)),
        );
    InMemoryDataset::from_schema(schema)
}

fn add_boundary(ds: &mut InMemoryDataset) -> Uuid {
    let id = Uuid::new_v4();
    ds.insert(
        "Boundary",
        &["GlobalID", "state"],
        vec![vec![id.into(), "No Processed".into()]],
    )
    .unwrap();
    id
}

fn add_approval(ds: &mut InMemoryDataset, boundary: Uuid, state: ApprovalState) -> ApprovalRef {
    let approval = ApprovalRef {
        id: Uuid::new_v4(),
        party_fk: Uuid::new_v4(),
        boundary_fk: boundary,
    };
    ds.insert(
        "PublicInspection_Approval",
        &["GlobalID", "party_fk", "boundary_fk", "is_approved"],
        vec![vec![
            approval.id.into(),
            approval.party_fk.into(),
            approval.boundary_fk.into(),
            state.as_str().into(),
        ]],
    )
    .unwrap();
    approval
}

fn boundary_state(ds: &InMemoryDataset, id: Uuid) -> String {
    let rows = ds
        .search("Boundary", Some(&["state"]), Some(&Filter::eq("GlobalID", id)))
        .unwrap();
    rows[0].text("state").unwrap().to_string()
}

fn approval_state(ds: &InMemoryDataset, id: Uuid) -> String {
    let rows = ds
        .search(
            "PublicInspection_Approval",
            None,
            Some(&Filter::eq("GlobalID", id)),
        )
        .unwrap();
    rows[0].text("is_approved").unwrap().to_string()
}

#[test]
fn test_missing_decision_defaults_to_yes() {
    let mut ds = inspection();
    let boundary = add_boundary(&mut ds);
    let approval = add_approval(&mut ds, boundary, ApprovalState::NoProcessed);

    let engine = ConsensusEngine::default();
    let report = engine.record_approval_decisions(&mut ds, &[approval], &[]);

    assert_eq!(report.updated, vec![(approval.id, ApprovalState::Yes)]);
    assert!(report.failed.is_empty());
    assert_eq!(approval_state(&ds, approval.id), "Yes");

    let rows = ds
        .search("PublicInspection_Approval", Some(&["approval_date"]), None)
        .unwrap();
    assert!(matches!(rows[0].value("approval_date"), Value::Date(_)));
}

#[test]
fn test_explicit_decision_is_applied() {
    let mut ds = inspection();
    let boundary = add_boundary(&mut ds);
    let approval = add_approval(&mut ds, boundary, ApprovalState::NoProcessed);
    let decision = NeighborDecision::new(approval.id, ApprovalState::No);

    let engine = ConsensusEngine::default();
    engine.record_approval_decisions(&mut ds, &[approval], &[decision]);

    assert_eq!(approval_state(&ds, approval.id), "No");
}

#[test]
fn test_unknown_approval_is_reported_and_batch_continues() {
    let mut ds = inspection();
    let boundary = add_boundary(&mut ds);
    let real = add_approval(&mut ds, boundary, ApprovalState::NoProcessed);
    let ghost = ApprovalRef {
        id: Uuid::new_v4(),
        party_fk: Uuid::new_v4(),
        boundary_fk: boundary,
    };

    let engine = ConsensusEngine::default();
    let report = engine.record_approval_decisions(&mut ds, &[ghost, real], &[]);

    assert_eq!(report.failed, vec![ghost.id]);
    assert_eq!(report.updated.len(), 1);
    assert_eq!(approval_state(&ds, real.id), "Yes");
}

#[test]
fn test_derivation_reads_full_approval_set() {
    let mut ds = inspection();
    let boundary = add_boundary(&mut ds);
    let signed = add_approval(&mut ds, boundary, ApprovalState::NoProcessed);
    add_approval(&mut ds, boundary, ApprovalState::NoProcessed);

    let engine = ConsensusEngine::default();
    engine.record_approval_decisions(&mut ds, &[signed], &[]);
    let report = engine.derive_boundary_states(&mut ds, &[signed]).unwrap();

    // the second party has not signed yet
    assert_eq!(report.state_of(boundary), Some(BoundaryState::InProcess));
    assert_eq!(boundary_state(&ds, boundary), "In Process");
}

#[test]
fn test_all_signed_yes_approves_boundary() {
    let mut ds = inspection();
    let boundary = add_boundary(&mut ds);
    let a = add_approval(&mut ds, boundary, ApprovalState::NoProcessed);
    let b = add_approval(&mut ds, boundary, ApprovalState::NoProcessed);

    let engine = ConsensusEngine::default();
    engine.record_approval_decisions(&mut ds, &[a, b], &[]);
    engine.derive_boundary_states(&mut ds, &[a, b]).unwrap();

    assert_eq!(boundary_state(&ds, boundary), "Approved");
}

#[test]
fn test_any_rejection_rejects_boundary() {
    let mut ds = inspection();
    let boundary = add_boundary(&mut ds);
    let a = add_approval(&mut ds, boundary, ApprovalState::Yes);
    let b = add_approval(&mut ds, boundary, ApprovalState::NoProcessed);

    let engine = ConsensusEngine::default();
    engine.record_approval_decisions(&mut ds, &[b], &[NeighborDecision::new(b.id, ApprovalState::No)]);
    let report = engine.derive_boundary_states(&mut ds, &[a, b]).unwrap();

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.state_of(boundary), Some(BoundaryState::Rejected));
}

#[test]
fn test_derivation_is_idempotent() {
    let mut ds = inspection();
    let boundary = add_boundary(&mut ds);
    let a = add_approval(&mut ds, boundary, ApprovalState::Yes);
    add_approval(&mut ds, boundary, ApprovalState::NoProcessed);

    let engine = ConsensusEngine::default();
    let first = engine.derive_boundary_states(&mut ds, &[a]).unwrap();
    let second = engine.derive_boundary_states(&mut ds, &[a]).unwrap();

    assert_eq!(first.state_of(boundary), second.state_of(boundary));
    assert_eq!(second.updated[0].previous, Some(BoundaryState::InProcess));
}

#[test]
fn test_empty_batch_is_noop() {
    let mut ds = inspection();
    let boundary = add_boundary(&mut ds);
    add_approval(&mut ds, boundary, ApprovalState::Yes);

    let engine = ConsensusEngine::default();
    let report = engine.derive_boundary_states(&mut ds, &[]).unwrap();

    assert!(report.updated.is_empty());
    assert_eq!(boundary_state(&ds, boundary), "No Processed");
}

#[test]
fn test_unknown_state_text_counts_as_not_processed() {
    let mut ds = inspection();
    let boundary = add_boundary(&mut ds);
    let odd = add_approval(&mut ds, boundary, ApprovalState::Yes);
    ds.update(
        "PublicInspection_Approval",
        &["is_approved"],
        &["Maybe".into()],
        &Filter::eq("GlobalID", odd.id),
    )
    .unwrap();

    let engine = ConsensusEngine::default();
    let report = engine.derive_boundary_states(&mut ds, &[odd]).unwrap();

    assert_eq!(report.state_of(boundary), Some(BoundaryState::NoProcessed));
}

#[test]
fn test_recalculate_all_covers_every_boundary() {
    let mut ds = inspection();
    let approved = add_boundary(&mut ds);
    let rejected = add_boundary(&mut ds);
    let untouched = add_boundary(&mut ds);
    add_approval(&mut ds, approved, ApprovalState::Yes);
    add_approval(&mut ds, rejected, ApprovalState::No);

    let engine = ConsensusEngine::default();
    let report = engine.recalculate_all(&mut ds).unwrap();

    assert_eq!(report.updated.len(), 3);
    assert_eq!(boundary_state(&ds, approved), "Approved");
    assert_eq!(boundary_state(&ds, rejected), "Rejected");
    assert_eq!(boundary_state(&ds, untouched), "No Processed");
}

#[test]
fn test_missing_class_is_structural() {
    let mut ds = InMemoryDataset::new("empty");
    let engine = ConsensusEngine::default();
    let err = engine.recalculate_all(&mut ds).unwrap_err();
    assert!(err.is_structural());
}
