//! Collection
//!
//! Document lifecycle scoped to one collection name.
//!
//! ## Responsibilities
//! - Assign `_id` / `createdAt` / `updatedAt` on insert
//! - Merge patches on update without touching `_id` or `createdAt`
//! - Build queries and run read-then-mutate operations over their results
//!
//! There is no isolation: `update` and `delete` scan first and mutate after,
//! so concurrent writers to the same document race and the last write wins.

use std::any::Any;
use std::sync::Arc;

use crate::codec;
use crate::document::{
    generate_id, now_timestamp, Document, CREATED_AT_KEY, ID_KEY, UPDATED_AT_KEY,
};
use crate::error::{AtlasError, Result};
use crate::query::{Filter, Query};
use crate::storage::StorageEngine;

/// A named namespace of documents
///
/// Cheap to clone; clones share the same storage engine.
#[derive(Clone)]
pub struct Collection {
    /// Collection name (storage namespace)
    name: String,

    /// Shared backend
    storage: Arc<dyn StorageEngine>,

    /// Max worker threads for `insert_many`
    insert_parallelism: usize,
}

impl Collection {
    pub fn new(name: impl Into<String>, storage: Arc<dyn StorageEngine>, insert_parallelism: usize) -> Self {
        Self {
            name: name.into(),
            storage,
            insert_parallelism: insert_parallelism.max(1),
        }
    }

    /// Get the collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert a document, returning it as stored
    ///
    /// Any `_id`, `createdAt` or `updatedAt` in `document` is replaced.
    /// Nothing is written if the document cannot be encoded.
    pub fn insert(&self, document: Document) -> Result<Document> {
        let id = generate_id();
        let now = now_timestamp();

        let mut document = document;
        document.insert(ID_KEY, id.clone());
        document.insert(CREATED_AT_KEY, now.clone());
        document.insert(UPDATED_AT_KEY, now);

        let payload = codec::encode(&document)?;
        self.storage.write(&self.name, &id, &payload)?;

        tracing::debug!("Inserted document {} into '{}'", id, self.name);
        Ok(document)
    }

    /// Insert many documents independently, fanned out over worker threads
    ///
    /// On success the stored documents are returned in input order. There is
    /// no rollback: if any insert fails, the documents already stored stay
    /// stored and are reported through `AtlasError::PartialInsert` together
    /// with the first failure in input order. When nothing was stored the
    /// first failure is returned as is.
    pub fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Document>> {
        let attempted = documents.len();
        if attempted == 0 {
            return Ok(Vec::new());
        }

        // Split into one contiguous chunk per worker, preserving order
        let workers = self.insert_parallelism.min(attempted);
        let chunk_size = (attempted + workers - 1) / workers;
        let mut chunks: Vec<Vec<Document>> = Vec::with_capacity(workers);
        let mut remaining = documents.into_iter();
        loop {
            let chunk: Vec<Document> = remaining.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            chunks.push(chunk);
        }

        let outcomes = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .into_iter()
                .map(|chunk| {
                    scope.spawn(move |_| {
                        chunk
                            .into_iter()
                            .map(|document| self.insert(document))
                            .collect::<Vec<Result<Document>>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .map_err(|panic| AtlasError::WorkerPanicked(panic_message(panic.as_ref())))
                })
                .collect::<Vec<_>>()
        })
        .map_err(|panic| AtlasError::WorkerPanicked(panic_message(panic.as_ref())))?;

        let mut inserted = Vec::with_capacity(attempted);
        let mut first_error = None;
        for outcome in outcomes {
            let results = match outcome {
                Ok(results) => results,
                Err(e) => {
                    first_error.get_or_insert(e);
                    continue;
                }
            };

            for result in results {
                match result {
                    Ok(document) => inserted.push(document),
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        match first_error {
            None => Ok(inserted),
            Some(e) if inserted.is_empty() => Err(e),
            Some(e) => {
                tracing::warn!(
                    "insert_many into '{}' stored {} of {} documents: {}",
                    self.name,
                    inserted.len(),
                    attempted,
                    e
                );
                Err(AtlasError::PartialInsert {
                    inserted,
                    attempted,
                    source: Box::new(e),
                })
            }
        }
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Build a query over this collection; no I/O until `exec()`
    pub fn find(&self, filter: impl Into<Filter>) -> Query {
        Query::new(&self.name, Arc::clone(&self.storage), filter.into())
    }

    /// First document matching `filter`, if any
    pub fn find_one(&self, filter: impl Into<Filter>) -> Result<Option<Document>> {
        self.find(filter).first()
    }

    /// Read a single document by id
    pub fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        match self.storage.read(&self.name, id)? {
            Some(payload) => Ok(Some(decode_stored(&self.name, &payload)?)),
            None => Ok(None),
        }
    }

    /// Number of documents matching `filter` (always a full scan)
    pub fn count(&self, filter: impl Into<Filter>) -> Result<usize> {
        Ok(self.find(filter).exec()?.len())
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Merge `patch` into every document matching `filter`
    ///
    /// Patch fields override document fields, except `_id` and `createdAt`
    /// which never change. `updatedAt` is refreshed and never moves
    /// backwards. Returns the number of documents rewritten.
    pub fn update(&self, filter: impl Into<Filter>, patch: Document) -> Result<usize> {
        // Reject an unencodable patch before touching any document
        codec::validate(&patch)?;

        let matches = self.find(filter).exec()?;
        let mut updated = 0;

        for mut document in matches {
            let id = stored_id(&self.name, &document)?;
            let previous = document.updated_at().map(str::to_string);

            for (key, value) in patch.iter() {
                if key == ID_KEY || key == CREATED_AT_KEY {
                    continue;
                }
                document.insert(key.clone(), value.clone());
            }

            let now = now_timestamp();
            let stamp = match previous {
                Some(previous) if previous > now => previous,
                _ => now,
            };
            document.insert(UPDATED_AT_KEY, stamp);

            let payload = codec::encode(&document)?;
            self.storage.write(&self.name, &id, &payload)?;

            tracing::debug!("Updated document {} in '{}'", id, self.name);
            updated += 1;
        }

        Ok(updated)
    }

    /// Update the first document matching `filter`
    pub fn update_one(&self, filter: impl Into<Filter>, patch: Document) -> Result<bool> {
        let Some(document) = self.find_one(filter)? else {
            return Ok(false);
        };

        let id = stored_id(&self.name, &document)?;
        Ok(self.update(Filter::by_id(id), patch)? > 0)
    }

    /// Update the document with the given id
    pub fn update_by_id(&self, id: &str, patch: Document) -> Result<bool> {
        self.update_one(Filter::by_id(id), patch)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete every document matching `filter`, returning how many
    pub fn delete(&self, filter: impl Into<Filter>) -> Result<usize> {
        let matches = self.find(filter).exec()?;

        for document in &matches {
            let id = stored_id(&self.name, document)?;
            self.storage.delete(&self.name, &id)?;
            tracing::debug!("Deleted document {} from '{}'", id, self.name);
        }

        Ok(matches.len())
    }

    /// Delete the first document matching `filter`
    pub fn delete_one(&self, filter: impl Into<Filter>) -> Result<bool> {
        let Some(document) = self.find_one(filter)? else {
            return Ok(false);
        };

        let id = stored_id(&self.name, &document)?;
        self.storage.delete(&self.name, &id)?;
        tracing::debug!("Deleted document {} from '{}'", id, self.name);
        Ok(true)
    }

    /// Delete the document with the given id
    pub fn delete_by_id(&self, id: &str) -> Result<bool> {
        self.delete_one(Filter::by_id(id))
    }
}

/// Decode a payload read from storage
///
/// Stored documents always carry a string `_id`; one without is treated as
/// corrupt so that update and delete can rely on it.
pub(crate) fn decode_stored(collection: &str, payload: &[u8]) -> Result<Document> {
    let document = codec::decode(payload)?;
    if document.id().is_none() {
        return Err(AtlasError::CorruptPayload(format!(
            "document in '{}' has no string {} field",
            collection, ID_KEY
        )));
    }
    Ok(document)
}

fn stored_id(collection: &str, document: &Document) -> Result<String> {
    document.id().map(str::to_string).ok_or_else(|| {
        AtlasError::CorruptPayload(format!(
            "document in '{}' has no string {} field",
            collection, ID_KEY
        ))
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
