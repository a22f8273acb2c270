//! Equality filters
//!
//! A filter is a set of `field => expected value` pairs. A document matches
//! when every field is present and equal (see [`Value::matches`]).

use std::collections::BTreeMap;

use crate::document::{Document, Value, ID_KEY};

/// Conjunction of field equality conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: BTreeMap<String, Value>,
}

impl Filter {
    /// A filter with no conditions; matches every document
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter selecting one document by `_id`
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::all().equals(ID_KEY, Value::String(id.into()))
    }

    /// Add a `field == value` condition
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether every condition holds for `document`; a missing field never matches
    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            document
                .get(field)
                .map_or(false, |actual| actual.matches(expected))
        })
    }
}

impl From<Document> for Filter {
    fn from(document: Document) -> Self {
        Self {
            conditions: document.into_inner(),
        }
    }
}

impl From<BTreeMap<String, Value>> for Filter {
    fn from(conditions: BTreeMap<String, Value>) -> Self {
        Self { conditions }
    }
}
