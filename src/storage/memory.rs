//! In-memory storage
//!
//! HashMap-based backend with the same absent/empty semantics as
//! `FileStorage`. Data is lost when the engine is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::error::{AtlasError, Result};

use super::{validate_component, StorageEngine};

type CollectionMap = HashMap<String, HashMap<String, Vec<u8>>>;

/// Storage engine keeping every payload in RAM
///
/// ## Concurrency:
/// - `collections`: Protected by RwLock (many concurrent readers, exclusive writer)
#[derive(Default)]
pub struct MemoryStorage {
    collections: RwLock<CollectionMap>,
    closed: AtomicBool,
}

impl MemoryStorage {
    /// Create an empty in-memory engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored payloads across collections
    pub fn document_count(&self) -> usize {
        self.collections.read().values().map(HashMap::len).sum()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AtlasError::Closed);
        }
        Ok(())
    }

    /// Open check plus the same name rules as `FileStorage`
    fn check(&self, collection: &str, id: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        validate_component("collection", collection)?;
        if let Some(id) = id {
            validate_component("document id", id)?;
        }
        Ok(())
    }
}

impl StorageEngine for MemoryStorage {
    fn write(&self, collection: &str, id: &str, payload: &[u8]) -> Result<()> {
        self.check(collection, Some(id))?;

        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), payload.to_vec());
        Ok(())
    }

    fn read(&self, collection: &str, id: &str) -> Result<Option<Vec<u8>>> {
        self.check(collection, Some(id))?;

        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn read_all(&self, collection: &str) -> Result<Vec<Vec<u8>>> {
        self.check(collection, None)?;

        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.check(collection, Some(id))?;

        // The namespace stays even when emptied, like a collection directory
        if let Some(docs) = self.collections.write().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    fn collection_names(&self) -> Result<Vec<String>> {
        self.ensure_open()?;

        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.collections.write().clear();
        Ok(())
    }
}
