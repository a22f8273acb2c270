//! Configuration for AtlasDoc
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{AtlasError, Result};

/// Main configuration for an AtlasDoc database
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all collections
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {collection}/
    ///           └── {document_id}.{file_extension}
    pub data_dir: PathBuf,

    /// Extension of document files (without the leading dot)
    pub file_extension: String,

    /// How document files are written to disk
    pub write_mode: WriteMode,

    // -------------------------------------------------------------------------
    // Collection Configuration
    // -------------------------------------------------------------------------
    /// Max worker threads used by `insert_many`
    pub insert_parallelism: usize,
}

/// Document file write strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Truncate and write the document file in place (fastest, a crash can
    /// leave a truncated file)
    Direct,

    /// Write a temp file in the collection directory, then rename it over
    /// the document file
    Atomic,

    /// Like `Atomic`, with an fsync of the temp file before the rename and
    /// of the collection directory after it (directory fsync is Unix only)
    AtomicSync,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./atlasdoc_data"),
            file_extension: "doc".to_string(),
            write_mode: WriteMode::Atomic,
            insert_parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values the storage layer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.file_extension.is_empty() {
            return Err(AtlasError::Config("file extension must not be empty".to_string()));
        }

        if self
            .file_extension
            .chars()
            .any(|c| c == '.' || c == '/' || c == '\\' || c == '\0')
        {
            return Err(AtlasError::Config(format!(
                "file extension {:?} must be a bare extension",
                self.file_extension
            )));
        }

        if self.insert_parallelism == 0 {
            return Err(AtlasError::Config(
                "insert parallelism must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all collections)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the document file extension
    pub fn file_extension(mut self, extension: impl Into<String>) -> Self {
        self.config.file_extension = extension.into();
        self
    }

    /// Set the write mode
    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.config.write_mode = mode;
        self
    }

    /// Set the number of `insert_many` workers
    pub fn insert_parallelism(mut self, workers: usize) -> Self {
        self.config.insert_parallelism = workers;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
