//! Old-identity to new-identity correlation
//!
//! While appending, every source row's global identifier is recorded next to
//! the object id it received in the destination. Repair reads the map instead
//! of a live correlation column, so destination schemas are never touched.

use indexmap::IndexMap;
use pi_data::ObjectId;
use uuid::Uuid;

/// Name of the correlation column for `class`, as it appears in logs
#[must_use]
pub fn correlation_field_name(class: &str) -> String {
    format!("temp_{}_id", class.to_ascii_lowercase())
}

#[derive(Debug, Clone, Default)]
struct ClassIdentities {
    /// Class name as appended
    name: String,
    by_source: IndexMap<Uuid, ObjectId>,
    appended: Vec<ObjectId>,
}

/// Correlation between load-dataset identities and inspection object ids
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    classes: IndexMap<String, ClassIdentities>,
}

impl IdentityMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, class: &str) -> &mut ClassIdentities {
        self.classes
            .entry(class.to_ascii_lowercase())
            .or_insert_with(|| ClassIdentities {
                name: class.to_string(),
                ..ClassIdentities::default()
            })
    }

    /// Record an appended row; `source_id` is its load-dataset global id
    pub fn record(&mut self, class: &str, source_id: Option<Uuid>, object_id: ObjectId) {
        let entry = self.entry(class);
        entry.appended.push(object_id);
        if let Some(source_id) = source_id {
            entry.by_source.insert(source_id, object_id);
        }
    }

    /// New object id of the row that carried `source_id` in the load dataset
    #[must_use]
    pub fn resolve(&self, class: &str, source_id: Uuid) -> Option<ObjectId> {
        self.classes
            .get(&class.to_ascii_lowercase())
            .and_then(|c| c.by_source.get(&source_id).copied())
    }

    /// Whether any correlated row exists for `class`
    #[must_use]
    pub fn correlates(&self, class: &str) -> bool {
        self.classes
            .get(&class.to_ascii_lowercase())
            .is_some_and(|c| !c.by_source.is_empty())
    }

    /// `(source id, new object id)` pairs for `class`, in append order
    pub fn correlations<'a>(&'a self, class: &str) -> impl Iterator<Item = (Uuid, ObjectId)> + 'a {
        self.classes
            .get(&class.to_ascii_lowercase())
            .into_iter()
            .flat_map(|c| c.by_source.iter().map(|(k, v)| (*k, *v)))
    }

    /// Object ids appended to `class` during this merge
    #[must_use]
    pub fn appended(&self, class: &str) -> &[ObjectId] {
        self.classes
            .get(&class.to_ascii_lowercase())
            .map_or(&[], |c| c.appended.as_slice())
    }

    /// Classes that received rows, in append order
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.values().map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.values().map(|c| c.by_source.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
