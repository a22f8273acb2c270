//! Document Module
//!
//! The in-memory shape of stored documents.
//!
//! ## Responsibilities
//! - Dynamic field values (`Value`)
//! - The `Document` mapping and its reserved metadata keys
//! - Id and timestamp generation for new documents
//!
//! ## Reserved Keys
//! ```text
//! _id        string, assigned at insert, never reassigned
//! createdAt  ISO-8601 timestamp, set once at insert
//! updatedAt  ISO-8601 timestamp, refreshed on every update
//! ```

mod id;
mod value;

pub use id::generate_id;
pub use value::Value;

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Key holding the document id
pub const ID_KEY: &str = "_id";

/// Key holding the insert timestamp
pub const CREATED_AT_KEY: &str = "createdAt";

/// Key holding the last-update timestamp
pub const UPDATED_AT_KEY: &str = "updatedAt";

/// Current time as an ISO-8601 string with millisecond precision
///
/// Fixed width with a `Z` suffix, so string order equals time order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A schemaless document: string keys mapped to dynamic values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a field, returning the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, Value> {
        self.0.keys()
    }

    /// The `_id` field, if present and a string
    pub fn id(&self) -> Option<&str> {
        self.get(ID_KEY).and_then(Value::as_str)
    }

    /// The `createdAt` field, if present and a string
    pub fn created_at(&self) -> Option<&str> {
        self.get(CREATED_AT_KEY).and_then(Value::as_str)
    }

    /// The `updatedAt` field, if present and a string
    pub fn updated_at(&self) -> Option<&str> {
        self.get(UPDATED_AT_KEY).and_then(Value::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        value::write_object(f, &self.0)
    }
}

impl From<BTreeMap<String, Value>> for Document {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.0)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Document {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.0
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build a [`Document`] from `key => value` pairs
///
/// ```
/// use atlasdoc::doc;
///
/// let user = doc! { "name" => "alice", "age" => 30, "tags" => vec!["a", "b"] };
/// assert_eq!(user.len(), 3);
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut document = $crate::Document::new();
        $(
            document.insert($key, $value);
        )+
        document
    }};
}
