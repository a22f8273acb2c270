//! Database Module
//!
//! Entry point that owns the storage engine and hands out collections.
//!
//! ## Responsibilities
//! - Build the storage engine from config (or accept an explicit one)
//! - Lazily create and cache `Collection` handles by name
//! - Close the engine and drop the registry on shutdown
//!
//! Each `Database` owns its own registry; two instances never share
//! collection handles, even when pointed at the same directory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::collection::Collection;
use crate::config::Config;
use crate::error::Result;
use crate::storage::{FileStorage, MemoryStorage, StorageEngine};

/// An embedded document database
pub struct Database {
    /// Database configuration
    config: Config,

    /// Backend shared by every collection
    storage: Arc<dyn StorageEngine>,

    /// Collections handed out so far, by name
    collections: RwLock<HashMap<String, Collection>>,
}

impl Database {
    /// Open or create a file-backed database with the given config
    ///
    /// Creates `config.data_dir` if it doesn't exist.
    pub fn open(config: Config) -> Result<Self> {
        let storage = FileStorage::from_config(&config)?;
        tracing::info!("Database opened at {}", config.data_dir.display());
        Ok(Self::build(config, Arc::new(storage)))
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().data_dir(path.as_ref()).build();
        Self::open(config)
    }

    /// Open on an explicit storage engine
    ///
    /// The engine wins over `config.data_dir`, which is ignored.
    pub fn open_with_storage(storage: Arc<dyn StorageEngine>, config: Config) -> Result<Self> {
        config.validate()?;
        tracing::info!("Database opened on a custom storage engine");
        Ok(Self::build(config, storage))
    }

    /// Create a database whose documents live only in memory
    pub fn in_memory() -> Result<Self> {
        Self::open_with_storage(Arc::new(MemoryStorage::new()), Config::default())
    }

    fn build(config: Config, storage: Arc<dyn StorageEngine>) -> Self {
        Self {
            config,
            storage,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create a collection handle
    ///
    /// Nothing touches storage until the first write.
    pub fn collection(&self, name: &str) -> Collection {
        if let Some(collection) = self.collections.read().get(name) {
            return collection.clone();
        }

        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!("Registering collection '{}'", name);
                Collection::new(name, Arc::clone(&self.storage), self.config.insert_parallelism)
            })
            .clone()
    }

    /// Names of the collections that hold storage
    pub fn collection_names(&self) -> Result<Vec<String>> {
        self.storage.collection_names()
    }

    /// Close the storage engine and drop every collection handle
    ///
    /// Collection handles still held by callers fail with
    /// `AtlasError::Closed` afterwards.
    pub fn close(&self) -> Result<()> {
        self.collections.write().clear();
        self.storage.close()?;
        tracing::info!("Database closed");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the storage engine
    pub fn storage(&self) -> &Arc<dyn StorageEngine> {
        &self.storage
    }

    /// Number of collection handles created so far
    pub fn registered_collections(&self) -> usize {
        self.collections.read().len()
    }
}
