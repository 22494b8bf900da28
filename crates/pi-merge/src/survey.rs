//! Survey snapshot of the load dataset

use crate::error::MergeError;
use pi_data::{Dataset, FieldType};

/// Copy `load` verbatim into `survey`, replacing whatever it held
///
/// Global ids are preserved; object ids are reassigned by the survey dataset.
/// Returns the number of rows copied.
///
/// # Errors
/// Returns error if either dataset cannot be read or written
pub fn snapshot_survey<L, S>(load: &L, survey: &mut S) -> Result<usize, MergeError>
where
    L: Dataset + ?Sized,
    S: Dataset + ?Sized,
{
    let schema = load.schema().clone();
    survey.recreate(schema.clone())?;
    tracing::info!(dataset = %schema.name, "survey dataset created");

    let mut copied = 0;
    for class in &schema.classes {
        let fields: Vec<&str> = class
            .fields
            .iter()
            .filter(|f| f.field_type != FieldType::ObjectId)
            .map(|f| f.name.as_str())
            .collect();
        let rows = load.search(&class.name, Some(&fields), None)?;
        if rows.is_empty() {
            continue;
        }
        let tuples = rows
            .iter()
            .map(|r| fields.iter().map(|f| r.value(f)).collect())
            .collect();
        copied += survey.insert(&class.name, &fields, tuples)?.len();
    }

    tracing::info!(rows = copied, "survey data imported");
    Ok(copied)
}
