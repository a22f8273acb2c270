//! # AtlasDoc
//!
//! An embedded document store with:
//! - Named collections of schemaless documents
//! - One file per document, binary encoded
//! - Filter / sort / skip / limit queries over full collection scans
//! - A pluggable storage engine (file-backed or in-memory)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Database                              │
//! │              (collection registry by name)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Collection                              │
//! │        (insert / update / delete / count / find)             │
//! └──────────┬──────────────────────────────┬───────────────────┘
//!            │                              │
//!            │                              ▼
//!            │                       ┌─────────────┐
//!            │                       │    Query    │
//!            │                       │ (scan+sort) │
//!            │                       └──────┬──────┘
//!            ▼                              ▼
//!     ┌─────────────┐               ┌──────────────┐
//!     │    Codec    │               │StorageEngine │
//!     │  (bincode)  │               │ (file / mem) │
//!     └─────────────┘               └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use atlasdoc::{doc, Database, SortOrder};
//!
//! let db = Database::open_path("./data")?;
//! let users = db.collection("users");
//!
//! users.insert(doc! { "name" => "alice", "age" => 30 })?;
//! let adults = users.find(doc! {}).sort("age", SortOrder::Desc).limit(10).exec()?;
//! # Ok::<(), atlasdoc::AtlasError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod document;
pub mod codec;
pub mod storage;
pub mod query;
pub mod collection;
pub mod database;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{AtlasError, Result};
pub use config::{Config, WriteMode};
pub use document::{Document, Value};
pub use storage::{FileStorage, MemoryStorage, StorageEngine};
pub use query::{Filter, Query, SortOrder};
pub use collection::Collection;
pub use database::Database;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AtlasDoc
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
