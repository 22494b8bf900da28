//! Testing utilities for the public inspection workspace
//!
//! Shared schemas, sample datasets, and file helpers.

#![allow(missing_docs)]

use pi_data::{
    ClassDef, DataAccess, DatasetSchema, Envelope, FieldDef, FieldType, InMemoryDataset,
    RelationshipClassDef, Value,
};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const PARCEL_DATASET: &str = "Parcel";
pub const REFERENCE_OBJECTS_DATASET: &str = "ReferenceObjects";
pub const SIGNATURE_CLASS: &str = "PublicInspection_ApprovalSignature";

fn spatial_unit() -> ClassDef {
    ClassDef::feature_class("SpatialUnit")
        .in_dataset(PARCEL_DATASET)
        .with_field(FieldDef::text("legal_id", 50).not_null())
        .with_field(FieldDef::text("record", 50))
        .with_field(FieldDef::new("Shape_Area", FieldType::Double))
}

fn boundary() -> ClassDef {
    ClassDef::feature_class("Boundary")
        .in_dataset(PARCEL_DATASET)
        .with_field(FieldDef::guid("spatialunit_fk"))
        .with_field(FieldDef::text("state", 50).with_domain("BoundaryState"))
        .with_field(FieldDef::text("neighbors", 255))
}

fn building() -> ClassDef {
    ClassDef::feature_class("Building")
        .in_dataset(REFERENCE_OBJECTS_DATASET)
        .with_field(FieldDef::text("use", 50))
}

fn party() -> ClassDef {
    ClassDef::table("Party")
        .with_field(FieldDef::text("name", 100))
        .with_field(FieldDef::guid("spatialunit_fk"))
}

/// Reference schema load datasets must match
pub fn ladm_schema() -> DatasetSchema {
    DatasetSchema::new("load")
        .with_class(spatial_unit())
        .with_class(boundary())
        .with_class(building())
        .with_class(party())
        .with_relationship(
            RelationshipClassDef::new("SpatialUnit_Boundary", "SpatialUnit", "Boundary", "GlobalID", "spatialunit_fk")
                .in_dataset(PARCEL_DATASET),
        )
        .with_relationship(RelationshipClassDef::new(
            "SpatialUnit_Party",
            "SpatialUnit",
            "Party",
            "GlobalID",
            "spatialunit_fk",
        ))
}

/// Inspection dataset schema: the load classes plus the inspection tables
pub fn parcel_schema() -> DatasetSchema {
    let mut schema = ladm_schema();
    schema.name = "inspection".to_string();
    if let Some(unit) = schema.class_mut("SpatialUnit") {
        unit.fields.push(FieldDef::guid("CreatedByRecord"));
        unit.fields.push(FieldDef::guid("RetiredByRecord"));
    }
    schema
        .with_class(
            ClassDef::table("PublicInspection_Approval")
                .with_field(FieldDef::guid("party_fk"))
                .with_field(FieldDef::guid("boundary_fk"))
                .with_field(FieldDef::text("is_approved", 50))
                .with_field(FieldDef::new("approval_date", FieldType::Date)),
        )
        .with_class(ClassDef::table(SIGNATURE_CLASS).with_field(FieldDef::guid("approval_fk")))
        .with_class(ClassDef::attachment_table(SIGNATURE_CLASS))
        .with_relationship(RelationshipClassDef::new(
            "Party_Approval",
            "Party",
            "PublicInspection_Approval",
            "GlobalID",
            "party_fk",
        ))
        .with_relationship(RelationshipClassDef::new(
            "Boundary_Approval",
            "Boundary",
            "PublicInspection_Approval",
            "GlobalID",
            "boundary_fk",
        ))
        .with_relationship(RelationshipClassDef::new(
            "Approval_Signature",
            "PublicInspection_Approval",
            SIGNATURE_CLASS,
            "GlobalID",
            "approval_fk",
        ))
        .with_relationship(RelationshipClassDef::new(
            "Signature_Attachment",
            SIGNATURE_CLASS,
            format!("{SIGNATURE_CLASS}__ATTACH"),
            "GlobalID",
            "REL_GLOBALID",
        ))
}

/// Load dataset populated with two spatial units
#[derive(Debug, Clone)]
pub struct SampleLoad {
    pub dataset: InMemoryDataset,
    pub units: Vec<Uuid>,
    pub boundaries: Vec<Uuid>,
    pub parties: Vec<Uuid>,
    /// Party whose spatial unit is not in the dataset
    pub stray_party: Uuid,
}

fn insert_one(ds: &mut InMemoryDataset, class: &str, fields: &[&str], values: Vec<Value>) {
    ds.insert(class, fields, vec![values]).unwrap();
}

pub fn sample_load() -> SampleLoad {
    let mut dataset = InMemoryDataset::from_schema(ladm_schema());
    let units = vec![Uuid::new_v4(), Uuid::new_v4()];
    let shapes = [
        Envelope::new(0.0, 0.0, 10.0, 10.0),
        Envelope::new(10.0, 0.0, 20.0, 10.0),
    ];
    for (i, (unit, shape)) in units.iter().zip(shapes).enumerate() {
        insert_one(
            &mut dataset,
            "SpatialUnit",
            &["GlobalID", "legal_id", "record", "Shape", "Shape_Area"],
            vec![
                (*unit).into(),
                format!("LEGAL-00{}", i + 1).into(),
                "R-2024-1".into(),
                shape.into(),
                100.0_f64.into(),
            ],
        );
    }

    let mut boundaries = Vec::new();
    for (unit, label) in [(units[0], "North"), (units[0], "East"), (units[1], "West")] {
        let id = Uuid::new_v4();
        insert_one(
            &mut dataset,
            "Boundary",
            &["GlobalID", "spatialunit_fk", "state", "neighbors"],
            vec![id.into(), unit.into(), "No Processed".into(), label.into()],
        );
        boundaries.push(id);
    }

    let mut parties = Vec::new();
    for (unit, name) in [(units[0], "Ana Perez"), (units[0], "Luis Gomez"), (units[1], "Marta Ruiz")] {
        let id = Uuid::new_v4();
        insert_one(
            &mut dataset,
            "Party",
            &["GlobalID", "name", "spatialunit_fk"],
            vec![id.into(), name.into(), unit.into()],
        );
        parties.push(id);
    }
    let stray_party = Uuid::new_v4();
    insert_one(
        &mut dataset,
        "Party",
        &["GlobalID", "name", "spatialunit_fk"],
        vec![stray_party.into(), "Nobody".into(), Uuid::new_v4().into()],
    );

    SampleLoad {
        dataset,
        units,
        boundaries,
        parties,
        stray_party,
    }
}

/// Inspection dataset with one spatial unit ready for signatures
#[derive(Debug, Clone)]
pub struct InspectionFixture {
    pub dataset: InMemoryDataset,
    pub unit: Uuid,
    pub legal_id: String,
    pub parties: Vec<Uuid>,
    pub boundaries: Vec<Uuid>,
}

pub fn inspection_fixture() -> InspectionFixture {
    let mut dataset = InMemoryDataset::from_schema(parcel_schema());
    let unit = Uuid::new_v4();
    let legal_id = "LEGAL-001".to_string();
    insert_one(
        &mut dataset,
        "SpatialUnit",
        &["GlobalID", "legal_id", "Shape"],
        vec![unit.into(), legal_id.clone().into(), Envelope::new(0.0, 0.0, 10.0, 10.0).into()],
    );

    let mut boundaries = Vec::new();
    for label in ["North - Luis Gomez", "East - Marta Ruiz"] {
        let id = Uuid::new_v4();
        insert_one(
            &mut dataset,
            "Boundary",
            &["GlobalID", "spatialunit_fk", "state", "neighbors"],
            vec![id.into(), unit.into(), "No Processed".into(), label.into()],
        );
        boundaries.push(id);
    }

    let mut parties = Vec::new();
    for name in ["Ana Perez", "Luis Gomez"] {
        let id = Uuid::new_v4();
        insert_one(
            &mut dataset,
            "Party",
            &["GlobalID", "name", "spatialunit_fk"],
            vec![id.into(), name.into(), unit.into()],
        );
        parties.push(id);
    }

    InspectionFixture {
        dataset,
        unit,
        legal_id,
        parties,
        boundaries,
    }
}

/// Empty scratch workspace
pub fn scratch_dataset() -> InMemoryDataset {
    InMemoryDataset::new("scratch")
}

/// Write a placeholder image named `<stem>.png` into `dir`
pub fn write_png(dir: &Path, stem: &str) -> PathBuf {
    let path = dir.join(format!("{stem}.png"));
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();
    path
}
