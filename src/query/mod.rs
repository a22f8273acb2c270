//! Query Module
//!
//! Builder and executor for filtered, sorted, paginated reads.
//!
//! ## Execution Pipeline
//! ```text
//! read_all ──▶ decode ──▶ filter ──▶ sort (stable) ──▶ skip ──▶ limit
//! ```
//!
//! Every `exec()` is an unindexed full scan of the collection: cost is
//! linear in collection size regardless of filter selectivity.

mod filter;

pub use filter::Filter;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::collection::decode_stored;
use crate::document::{Document, Value};
use crate::error::{AtlasError, Result};
use crate::storage::StorageEngine;

/// Direction of a sort
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(AtlasError::Config(format!("unknown sort order {:?}", other))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

/// Compare two possibly-missing field values
///
/// A missing field sorts before every present value, `Null` included.
pub fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.sort_cmp(b),
    }
}

/// A query over one collection
///
/// Built by `Collection::find`; no I/O happens until `exec()`, which
/// consumes the query.
pub struct Query {
    /// Collection being scanned
    collection: String,

    /// Backend the payloads are read from
    storage: Arc<dyn StorageEngine>,

    /// Equality conditions (immutable once built)
    filter: Filter,

    /// Max results, 0 = unbounded
    limit: usize,

    /// Leading results to drop
    skip: usize,

    /// Optional sort field and direction
    sort: Option<(String, SortOrder)>,
}

impl Query {
    pub(crate) fn new(collection: &str, storage: Arc<dyn StorageEngine>, filter: Filter) -> Self {
        Self {
            collection: collection.to_string(),
            storage,
            filter,
            limit: 0,
            skip: 0,
            sort: None,
        }
    }

    /// Return at most `n` documents (0 = no limit)
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = n;
        self
    }

    /// Drop the first `n` documents
    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    /// Sort by `field`; the field does not need to exist on any document
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Run the query
    ///
    /// A payload that fails to decode fails the whole query rather than
    /// being dropped from the results.
    pub fn exec(self) -> Result<Vec<Document>> {
        // Step 1: Read every payload in the collection
        let payloads = self.storage.read_all(&self.collection)?;
        let scanned = payloads.len();

        // Step 2 + 3: Decode and keep matching documents
        let mut results = Vec::new();
        for payload in &payloads {
            let document = decode_stored(&self.collection, payload)?;
            if self.filter.matches(&document) {
                results.push(document);
            }
        }
        let matched = results.len();

        // Step 4: Stable sort
        if let Some((field, order)) = &self.sort {
            results.sort_by(|a, b| {
                let ord = compare_field(a.get(field), b.get(field));
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        // Step 5: Skip, then limit
        let limit = if self.limit == 0 { usize::MAX } else { self.limit };
        let results: Vec<Document> = results.into_iter().skip(self.skip).take(limit).collect();

        tracing::debug!(
            "Query on '{}': scanned={}, matched={}, returned={}",
            self.collection,
            scanned,
            matched,
            results.len()
        );

        Ok(results)
    }

    /// Run the query and return its first result
    pub fn first(self) -> Result<Option<Document>> {
        Ok(self.limit(1).exec()?.into_iter().next())
    }
}
