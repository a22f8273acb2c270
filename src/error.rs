//! Error types for AtlasDoc
//!
//! Provides a unified error type for all operations.
//!
//! "Not found" is never an error here: absent documents, absent collections
//! and deletes of absent ids resolve to `None`, an empty `Vec`, or a no-op.

use std::path::PathBuf;

use thiserror::Error;

use crate::document::Document;

/// Result type alias using AtlasError
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Unified error type for AtlasDoc operations
#[derive(Debug, Error)]
pub enum AtlasError {
    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("Unsupported value at field '{field}': {reason}")]
    UnsupportedValue { field: String, reason: String },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {kind} name: {name:?}")]
    InvalidName { kind: &'static str, name: String },

    #[error("Storage engine is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Collection Errors
    // -------------------------------------------------------------------------
    #[error("insert_many stored {} of {attempted} documents before failing: {source}", .inserted.len())]
    PartialInsert {
        inserted: Vec<Document>,
        attempted: usize,
        #[source]
        source: Box<AtlasError>,
    },

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AtlasError {
    /// Wrap an I/O error with the path it happened on
    pub(crate) fn unavailable(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| AtlasError::StorageUnavailable { path, source }
    }
}
