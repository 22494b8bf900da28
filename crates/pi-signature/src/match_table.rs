//! Reusable scratch relation staging `(key, image path)` pairs

use crate::error::IntakeError;
use pi_data::{ClassDef, Dataset, FieldDef, MatchSpec, Value};
use std::path::Path;
use uuid::Uuid;

pub const MATCH_TABLE_NAME: &str = "MatchTable";
pub const MATCH_FIELD: &str = "MatchID";
pub const PICTURE_FIELD: &str = "PicturePath";

/// Handle on the scratch match table
///
/// The same relation is reused across intakes; [`MatchTable::prepare`]
/// creates it on first use and empties it on every later one.
#[derive(Debug, Clone, Copy)]
pub struct MatchTable(());

impl MatchTable {
    /// Create or truncate the match table in `scratch`
    ///
    /// # Errors
    /// Returns error if the scratch workspace cannot be reshaped
    pub fn prepare<M: Dataset + ?Sized>(scratch: &mut M) -> Result<Self, IntakeError> {
        if scratch.class_def(MATCH_TABLE_NAME).is_none() {
            scratch.create_class(ClassDef::table(MATCH_TABLE_NAME))?;
            tracing::info!(table = MATCH_TABLE_NAME, "match table created");
        }
        for field in [MATCH_FIELD, PICTURE_FIELD] {
            let present = scratch
                .class_def(MATCH_TABLE_NAME)
                .is_some_and(|c| c.has_field(field));
            if !present {
                scratch.add_field(MATCH_TABLE_NAME, FieldDef::text(field, 255))?;
            }
        }
        let removed = scratch.truncate(MATCH_TABLE_NAME)?;
        tracing::info!(removed, "match table truncated");
        Ok(Self(()))
    }

    /// Stage one image for the row keyed by `key`
    ///
    /// # Errors
    /// Returns error if the row cannot be inserted
    pub fn stage<M: Dataset + ?Sized>(
        &self,
        scratch: &mut M,
        key: Uuid,
        path: &Path,
    ) -> Result<(), IntakeError> {
        scratch.insert(
            MATCH_TABLE_NAME,
            &[MATCH_FIELD, PICTURE_FIELD],
            vec![vec![
                Value::Text(key.to_string()),
                Value::Text(path.to_string_lossy().into_owned()),
            ]],
        )?;
        Ok(())
    }

    /// Names handed to the attachment store
    #[must_use]
    pub fn spec(&self) -> MatchSpec<'static> {
        MatchSpec {
            table: MATCH_TABLE_NAME,
            key_field: MATCH_FIELD,
            value_field: PICTURE_FIELD,
        }
    }
}
