//! File-backed storage
//!
//! One directory per collection, one file per document.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::config::{Config, WriteMode};
use crate::error::{AtlasError, Result};

use super::{validate_component, StorageEngine, TEMP_PREFIX};

/// Distinguishes temp files of concurrent writers within this process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Storage engine mapping documents to files under a base directory
///
/// ## Concurrency:
/// - No engine-level locks; concurrent writers to the same id race at the
///   filesystem level and the last rename (or write) wins
/// - `closed`: Atomic flag checked on every operation
pub struct FileStorage {
    /// Root directory, one subdirectory per collection
    base_path: PathBuf,

    /// Extension of document files (without the dot)
    extension: String,

    /// How document files are written
    write_mode: WriteMode,

    /// Set by `close()`
    closed: AtomicBool,
}

impl FileStorage {
    /// Open or create storage rooted at `base_path`
    ///
    /// Creates the base directory (recursively) once. Fails with
    /// `StorageUnavailable` if it cannot be created.
    pub fn open(base_path: &Path, extension: &str, write_mode: WriteMode) -> Result<Self> {
        fs::create_dir_all(base_path).map_err(AtlasError::unavailable(base_path))?;

        tracing::info!("File storage opened at {}", base_path.display());

        Ok(Self {
            base_path: base_path.to_path_buf(),
            extension: extension.to_string(),
            write_mode,
            closed: AtomicBool::new(false),
        })
    }

    /// Open storage with the path, extension and write mode of a config
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Self::open(&config.data_dir, &config.file_extension, config.write_mode)
    }

    /// Get the base directory path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the document file extension
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Directory of a collection
    pub fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        validate_component("collection", collection)?;
        Ok(self.base_path.join(collection))
    }

    /// File of a document
    pub fn document_path(&self, collection: &str, id: &str) -> Result<PathBuf> {
        let dir = self.collection_path(collection)?;
        validate_component("document id", id)?;
        Ok(dir.join(format!("{}.{}", id, self.extension)))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AtlasError::Closed);
        }
        Ok(())
    }

    /// Whether a directory entry name is a document file of this storage
    fn is_document_file(&self, name: &str) -> bool {
        if name.starts_with(TEMP_PREFIX) {
            return false;
        }
        match name.rsplit_once('.') {
            Some((stem, ext)) => !stem.is_empty() && ext == self.extension,
            None => false,
        }
    }

    /// Write to a temp file next to `path`, then rename over it
    fn write_atomic(&self, dir: &Path, path: &Path, payload: &[u8], sync: bool) -> Result<()> {
        let temp_path = dir.join(format!(
            "{}{}-{}",
            TEMP_PREFIX,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let result = (|| -> Result<()> {
            let mut file = File::create(&temp_path).map_err(AtlasError::unavailable(&temp_path))?;
            file.write_all(payload)
                .map_err(AtlasError::unavailable(&temp_path))?;
            if sync {
                file.sync_all().map_err(AtlasError::unavailable(&temp_path))?;
            }
            fs::rename(&temp_path, path).map_err(AtlasError::unavailable(path))
        })();

        if result.is_err() {
            // Best effort; the temp name is invisible to read_all either way
            let _ = fs::remove_file(&temp_path);
            return result;
        }

        if sync {
            // The rename lives in the directory entry
            sync_dir(dir)?;
        }
        Ok(())
    }
}

impl StorageEngine for FileStorage {
    fn write(&self, collection: &str, id: &str, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;

        let dir = self.collection_path(collection)?;
        let path = self.document_path(collection, id)?;

        // Idempotent: the collection may already exist
        let created = !dir.is_dir();
        fs::create_dir_all(&dir).map_err(AtlasError::unavailable(&dir))?;
        if created && self.write_mode == WriteMode::AtomicSync {
            sync_dir(&self.base_path)?;
        }

        match self.write_mode {
            WriteMode::Direct => fs::write(&path, payload).map_err(AtlasError::unavailable(&path)),
            WriteMode::Atomic => self.write_atomic(&dir, &path, payload, false),
            WriteMode::AtomicSync => self.write_atomic(&dir, &path, payload, true),
        }
    }

    fn read(&self, collection: &str, id: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;

        let path = self.document_path(collection, id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AtlasError::StorageUnavailable { path, source: e }),
        }
    }

    fn read_all(&self, collection: &str) -> Result<Vec<Vec<u8>>> {
        self.ensure_open()?;

        let dir = self.collection_path(collection)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AtlasError::StorageUnavailable { path: dir, source: e }),
        };

        let mut payloads = Vec::new();
        for entry in entries {
            let entry = entry.map_err(AtlasError::unavailable(&dir))?;
            let path = entry.path();

            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !self.is_document_file(&name) {
                tracing::trace!("Skipping non-document entry {}", path.display());
                continue;
            }

            let file_type = entry.file_type().map_err(AtlasError::unavailable(&path))?;
            if !file_type.is_file() {
                tracing::trace!("Skipping non-file entry {}", path.display());
                continue;
            }

            match fs::read(&path) {
                Ok(bytes) => payloads.push(bytes),
                // Deleted between listing and reading
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::warn!("Document file vanished during scan: {}", path.display());
                }
                Err(e) => return Err(AtlasError::StorageUnavailable { path, source: e }),
            }
        }

        Ok(payloads)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.ensure_open()?;

        let path = self.document_path(collection, id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AtlasError::StorageUnavailable { path, source: e }),
        }
    }

    fn collection_names(&self) -> Result<Vec<String>> {
        self.ensure_open()?;

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_path).map_err(AtlasError::unavailable(&self.base_path))? {
            let entry = entry.map_err(AtlasError::unavailable(&self.base_path))?;
            let is_dir = entry
                .file_type()
                .map_err(AtlasError::unavailable(entry.path()))?
                .is_dir();

            if !is_dir {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if validate_component("collection", &name).is_ok() {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    fn close(&self) -> Result<()> {
        // Nothing is held open between calls; just refuse further work
        self.closed.store(true, Ordering::Release);
        tracing::info!("File storage at {} closed", self.base_path.display());
        Ok(())
    }
}

/// Flush a directory's entries (new names, renames) to disk
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)
        .and_then(|handle| handle.sync_all())
        .map_err(AtlasError::unavailable(dir))
}

/// No-op: `File::open` cannot open a directory handle off Unix
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
