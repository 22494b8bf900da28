//! Filter predicates
//!
//! The host storage accepts predicates in a small SQL-like grammar
//! (`field = 'value'`, `field IN (...)`, `field IS NULL`). Callers compose a
//! [`Filter`] and storage either evaluates it directly or uses its textual
//! rendering.

use crate::value::{Row, Value};

/// Row predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field = value`
    Eq(String, Value),
    /// `field IN (values)`; an empty list matches nothing
    In(String, Vec<Value>),
    /// `field IS NULL`
    IsNull(String),
    /// `field IS NOT NULL`
    NotNull(String),
    /// Conjunction of all parts
    And(Vec<Filter>),
}

impl Filter {
    #[inline]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn in_values<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    #[inline]
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull(field.into())
    }

    #[inline]
    pub fn not_null(field: impl Into<String>) -> Self {
        Self::NotNull(field.into())
    }

    /// Conjoin, flattening nested conjunctions
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        let mut parts = match self {
            Self::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Self::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Self::And(parts)
    }

    /// Evaluate against a row; a missing field reads as null
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::Eq(field, Value::Null) | Self::IsNull(field) => {
                row.get(field).map_or(true, Value::is_null)
            }
            Self::Eq(field, value) => row.get(field).is_some_and(|v| v.matches(value)),
            Self::In(field, values) => row
                .get(field)
                .is_some_and(|v| values.iter().any(|candidate| v.matches(candidate))),
            Self::NotNull(field) => row.get(field).is_some_and(|v| !v.is_null()),
            Self::And(parts) => parts.iter().all(|p| p.matches(row)),
        }
    }

    /// Fields referenced by this predicate
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Eq(f, _) | Self::In(f, _) | Self::IsNull(f) | Self::NotNull(f) => vec![f.as_str()],
            Self::And(parts) => parts.iter().flat_map(Filter::fields).collect(),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eq(field, Value::Null) | Self::IsNull(field) => write!(f, "{field} IS NULL"),
            Self::Eq(field, value) => write!(f, "{field} = {}", value.literal()),
            Self::In(_, values) if values.is_empty() => write!(f, "1 = 0"),
            Self::In(field, values) => {
                let list: Vec<String> = values.iter().map(Value::literal).collect();
                write!(f, "{field} IN ({})", list.join(","))
            }
            Self::NotNull(field) => write!(f, "{field} IS NOT NULL"),
            Self::And(parts) => {
                let rendered: Vec<String> = parts
                    .iter()
                    .map(|p| match p {
                        Self::And(_) => format!("({p})"),
                        _ => p.to_string(),
                    })
                    .collect();
                write!(f, "{}", rendered.join(" AND "))
            }
        }
    }
}
