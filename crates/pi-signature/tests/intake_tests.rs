use pi_consensus::{ApprovalState, BoundaryState, InspectionModel};
use pi_data::{attachment_table_name, DataAccess, Filter, InMemoryDataset};
use pi_signature::*;
use pi_test_utils::{inspection_fixture, scratch_dataset, write_png, InspectionFixture, SIGNATURE_CLASS};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use uuid::Uuid;

/// Writes the images a capture device would leave behind
struct DeskCapture {
    dir: PathBuf,
    fingerprint: bool,
}

impl SignatureCapture for DeskCapture {
    fn capture(
        &mut self,
        party_id: Uuid,
        _party_name: &str,
    ) -> Result<Option<CapturedImages>, IntakeError> {
        let signature = write_png(&self.dir, &party_id.to_string());
        let fingerprint = self
            .fingerprint
            .then(|| write_png(&self.dir, &format!("{party_id}_fp")));
        Ok(Some(CapturedImages {
            signature,
            fingerprint,
        }))
    }
}

struct RecordingView {
    name: String,
    resets: Rc<RefCell<Vec<String>>>,
    fail: bool,
}

impl SelectionView for RecordingView {
    fn name(&self) -> &str {
        &self.name
    }

    fn clear_selection(&mut self) -> Result<(), IntakeError> {
        self.resets.borrow_mut().push(self.name.clone());
        if self.fail {
            return Err(IntakeError::Selection(self.name.clone()));
        }
        Ok(())
    }
}

fn intake(dir: &tempfile::TempDir, fingerprint: bool) -> SignatureIntake {
    SignatureIntake::new(
        InspectionModel::default(),
        DeskCapture {
            dir: dir.path().to_path_buf(),
            fingerprint,
        },
    )
}

fn request_for(fixture: &InspectionFixture, party_name: &str) -> IntakeRequest {
    let queries = InspectionQueries::default();
    let unit = queries
        .spatial_unit_by_legal_id(&fixture.dataset, &fixture.legal_id)
        .unwrap();
    let party = unit.as_ref().and_then(|u| {
        queries
            .parties_by_spatial_unit(&fixture.dataset, u)
            .unwrap()
            .into_iter()
            .find(|p| p.name == party_name)
    });
    let neighbors = match (&unit, &party) {
        (Some(u), Some(p)) => queries.neighboring_approvals(&fixture.dataset, u, p).unwrap(),
        _ => Vec::new(),
    };
    IntakeRequest {
        spatial_unit: unit,
        party,
        neighbors,
    }
}

fn attachments(ds: &InMemoryDataset) -> Vec<String> {
    ds.search(&attachment_table_name(SIGNATURE_CLASS), Some(&["ATT_NAME"]), None)
        .unwrap()
        .iter()
        .filter_map(|r| r.text("ATT_NAME").map(str::to_string))
        .collect()
}

fn state(ds: &InMemoryDataset, boundary: Uuid) -> String {
    ds.search("Boundary", Some(&["state"]), Some(&Filter::eq("GlobalID", boundary)))
        .unwrap()[0]
        .text("state")
        .unwrap()
        .to_string()
}

#[test]
fn test_resigning_replaces_images() {
    let mut fixture = inspection_fixture();
    let mut scratch = scratch_dataset();
    let dir = tempfile::tempdir().unwrap();
    let mut intake = intake(&dir, true);
    let request = request_for(&fixture, "Ana Perez");

    intake
        .capture_and_attach(&mut fixture.dataset, &mut scratch, &request)
        .unwrap();
    let first = attachments(&fixture.dataset);
    intake
        .capture_and_attach(&mut fixture.dataset, &mut scratch, &request)
        .unwrap();
    let second = attachments(&fixture.dataset);

    // two approvals, signature and fingerprint on each
    assert_eq!(first.len(), 4);
    assert_eq!(second.len(), 4);
    let party = fixture.parties[0];
    assert_eq!(
        second.iter().filter(|n| **n == signature_file_name(party)).count(),
        2
    );
    assert_eq!(
        second.iter().filter(|n| **n == fingerprint_file_name(party)).count(),
        2
    );
    assert_eq!(fixture.dataset.count(SIGNATURE_CLASS).unwrap(), 2);
    assert_eq!(fixture.dataset.count("PublicInspection_Approval").unwrap(), 4);
}

#[test]
fn test_match_table_is_reused() {
    let mut fixture = inspection_fixture();
    let mut scratch = scratch_dataset();
    let dir = tempfile::tempdir().unwrap();
    let mut intake = intake(&dir, false);

    for name in ["Ana Perez", "Luis Gomez"] {
        let request = request_for(&fixture, name);
        intake
            .capture_and_attach(&mut fixture.dataset, &mut scratch, &request)
            .unwrap();
        assert_eq!(scratch.count(MATCH_TABLE_NAME).unwrap(), 2);
    }
}

#[test]
fn test_all_parties_signing_approves_boundaries() {
    let mut fixture = inspection_fixture();
    let mut scratch = scratch_dataset();
    let dir = tempfile::tempdir().unwrap();
    let mut intake = intake(&dir, false);

    let first = request_for(&fixture, "Ana Perez");
    intake
        .capture_and_attach(&mut fixture.dataset, &mut scratch, &first)
        .unwrap();
    for boundary in &fixture.boundaries {
        assert_eq!(state(&fixture.dataset, *boundary), "In Process");
    }

    let second = request_for(&fixture, "Luis Gomez");
    let outcome = intake
        .capture_and_attach(&mut fixture.dataset, &mut scratch, &second)
        .unwrap();
    let IntakeOutcome::Attached { boundaries, .. } = outcome else {
        panic!("expected attachment, got {outcome:?}");
    };
    for boundary in &fixture.boundaries {
        assert_eq!(boundaries.state_of(*boundary), Some(BoundaryState::Approved));
        assert_eq!(state(&fixture.dataset, *boundary), "Approved");
    }
    assert_eq!(fixture.dataset.count("PublicInspection_Approval").unwrap(), 4);
}

#[test]
fn test_neighbor_rejection_rejects_boundary() {
    let mut fixture = inspection_fixture();
    let mut scratch = scratch_dataset();
    let dir = tempfile::tempdir().unwrap();
    let mut intake = intake(&dir, false);

    let mut request = request_for(&fixture, "Ana Perez");
    let changed = apply_table_decisions(
        &mut request.neighbors,
        &[("East - Marta Ruiz".to_string(), ApprovalState::No)],
    );
    assert_eq!(changed, 1);

    intake
        .capture_and_attach(&mut fixture.dataset, &mut scratch, &request)
        .unwrap();

    assert_eq!(state(&fixture.dataset, fixture.boundaries[0]), "In Process");
    assert_eq!(state(&fixture.dataset, fixture.boundaries[1]), "Rejected");
}

#[test]
fn test_selection_reset_is_best_effort() {
    let mut fixture = inspection_fixture();
    let mut scratch = scratch_dataset();
    let dir = tempfile::tempdir().unwrap();
    let resets = Rc::new(RefCell::new(Vec::new()));
    let mut intake = intake(&dir, false)
        .with_view(RecordingView {
            name: "PublicInspection_Approval".into(),
            resets: Rc::clone(&resets),
            fail: true,
        })
        .with_view(RecordingView {
            name: "Boundary".into(),
            resets: Rc::clone(&resets),
            fail: false,
        });

    let request = request_for(&fixture, "Ana Perez");
    let outcome = intake
        .capture_and_attach(&mut fixture.dataset, &mut scratch, &request)
        .unwrap();

    assert!(matches!(outcome, IntakeOutcome::Attached { .. }));
    assert_eq!(
        *resets.borrow(),
        vec!["PublicInspection_Approval".to_string(), "Boundary".to_string()]
    );
}

#[test]
fn test_unknown_unit_or_party_is_skipped() {
    let mut fixture = inspection_fixture();
    let mut scratch = scratch_dataset();
    let dir = tempfile::tempdir().unwrap();
    let mut intake = intake(&dir, false);

    let no_party = request_for(&fixture, "Nobody");
    let outcome = intake
        .capture_and_attach(&mut fixture.dataset, &mut scratch, &no_party)
        .unwrap();
    assert_eq!(outcome, IntakeOutcome::Skipped("no party selected".into()));

    let outcome = intake
        .capture_and_attach(&mut fixture.dataset, &mut scratch, &IntakeRequest::default())
        .unwrap();
    assert_eq!(outcome, IntakeOutcome::Skipped("no spatial unit selected".into()));

    assert_eq!(fixture.dataset.count("PublicInspection_Approval").unwrap(), 0);
    assert!(attachments(&fixture.dataset).is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
