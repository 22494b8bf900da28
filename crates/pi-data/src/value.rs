//! Field values, rows, and object identifiers
//!
//! Values are deliberately loose: a GUID stored as text still matches a
//! [`Value::Guid`] in a filter, the same way the host storage compares them.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage-assigned object identifier (`OBJECTID`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub i64);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned bounding box of a shape
///
/// Geometry itself is owned by the spatial engine; the core only needs
/// envelopes to compute map extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Envelope {
    /// Create envelope from corner coordinates
    #[inline]
    #[must_use]
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// An envelope with no area does not contribute to extents
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Smallest envelope containing both
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
        }
    }

    /// Scale around the center by `factor`
    #[must_use]
    pub fn expand(&self, factor: f64) -> Self {
        let cx = (self.xmin + self.xmax) / 2.0;
        let cy = (self.ymin + self.ymax) / 2.0;
        let half_w = self.width() * factor / 2.0;
        let half_h = self.height() * factor / 2.0;
        Self::new(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
    }
}

/// A single field value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Integer(i64),
    Double(f64),
    Guid(Uuid),
    Date(DateTime<Utc>),
    Shape(Envelope),
}

impl Value {
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow text content, if this is a text value
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// GUID content; text values are parsed in any of the usual GUID forms
    #[must_use]
    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            Self::Guid(g) => Some(*g),
            Self::Text(s) => Uuid::parse_str(s.trim()).ok(),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_shape(&self) -> Option<&Envelope> {
        match self {
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }

    /// Storage equality used by filters
    ///
    /// Nulls never match anything here; `IS NULL` is a separate predicate.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Guid(a), Self::Guid(b)) => a == b,
            (Self::Guid(g), Self::Text(t)) | (Self::Text(t), Self::Guid(g)) => {
                Uuid::parse_str(t.trim()).is_ok_and(|parsed| parsed == *g)
            }
            (Self::Integer(a), Self::Integer(b)) => a == b,
            #[allow(clippy::cast_precision_loss)]
            (Self::Integer(i), Self::Double(d)) | (Self::Double(d), Self::Integer(i)) => {
                (*i as f64 - d).abs() < f64::EPSILON
            }
            (Self::Double(a), Self::Double(b)) => (a - b).abs() < f64::EPSILON,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Shape(a), Self::Shape(b)) => a == b,
            _ => false,
        }
    }

    /// Render as a filter literal
    pub(crate) fn literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Integer(i) => i.to_string(),
            Self::Double(d) => d.to_string(),
            Self::Guid(g) => format!("'{{{}}}'", g.hyphenated().to_string().to_uppercase()),
            Self::Date(d) => format!("'{}'", d.format("%Y-%m-%d %H:%M:%S")),
            Self::Shape(_) => "'<shape>'".to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "<null>"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Guid(g) => write!(f, "{g}"),
            Self::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Self::Shape(e) => write!(f, "[{}, {}, {}, {}]", e.xmin, e.ymin, e.xmax, e.ymax),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Guid(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<Envelope> for Value {
    fn from(value: Envelope) -> Self {
        Self::Shape(value)
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Self::Integer(value.0)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One record as returned by a search
///
/// Field lookups are case-insensitive, matching the host storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    values: IndexMap<String, Value>,
}

impl Row {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Set a field, replacing any same-named (case-insensitive) entry
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        if let Some((_, slot)) = self
            .values
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&field))
        {
            *slot = value;
        } else {
            self.values.insert(field, value);
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(field))
            .map(|(_, v)| v)
    }

    /// Value or [`Value::Null`] when the field is absent
    #[must_use]
    pub fn value(&self, field: &str) -> Value {
        self.get(field).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_text)
    }

    #[must_use]
    pub fn guid(&self, field: &str) -> Option<Uuid> {
        self.get(field).and_then(Value::as_guid)
    }

    pub(crate) fn remove(&mut self, field: &str) -> Option<Value> {
        let key = self
            .values
            .keys()
            .find(|k| k.eq_ignore_ascii_case(field))
            .cloned()?;
        self.values.shift_remove(&key)
    }

    /// Iterate fields in storage order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_matches_braced_text() {
        let id = Uuid::new_v4();
        let braced = format!("{{{}}}", id.to_string().to_uppercase());
        assert!(Value::Guid(id).matches(&Value::Text(braced)));
        assert!(!Value::Guid(id).matches(&Value::Text("not-a-guid".into())));
    }

    #[test]
    fn null_never_matches() {
        assert!(!Value::Null.matches(&Value::Null));
    }

    #[test]
    fn envelope_union_and_expand() {
        let a = Envelope::new(0.0, 0.0, 10.0, 10.0);
        let b = Envelope::new(5.0, -5.0, 20.0, 5.0);
        let u = a.union(&b);
        assert_eq!(u, Envelope::new(0.0, -5.0, 20.0, 10.0));

        let e = Envelope::new(0.0, 0.0, 10.0, 10.0).expand(1.2);
        assert!((e.width() - 12.0).abs() < 1e-9);
        assert!((e.xmin + 1.0).abs() < 1e-9);
    }

    #[test]
    fn row_lookup_is_case_insensitive() {
        let mut row = Row::new().with("Legal_ID", "A-1");
        assert_eq!(row.text("legal_id"), Some("A-1"));
        row.set("LEGAL_ID", "A-2");
        assert_eq!(row.len(), 1);
        assert_eq!(row.text("Legal_ID"), Some("A-2"));
    }

    #[test]
    fn guid_literal_is_braced_upper() {
        let id = Uuid::nil();
        assert_eq!(
            Value::Guid(id).literal(),
            "'{00000000-0000-0000-0000-000000000000}'"
        );
    }
}
