//! Storage Module
//!
//! Durable key-value persistence scoped by collection name and document id.
//!
//! ## Responsibilities
//! - Store opaque payloads under (collection, id)
//! - Report absent documents and collections as `None` / empty, never as errors
//! - Propagate every other failure as `StorageUnavailable`
//!
//! ## On-Disk Layout (FileStorage)
//! ```text
//! {base_path}/
//!   ├── users/
//!   │     ├── {id}.doc        (raw encoded document, no envelope)
//!   │     └── {id}.doc
//!   └── orders/
//!         └── {id}.doc
//! ```

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::{AtlasError, Result};

/// Prefix of in-flight temp files; never a valid collection name or id
pub(crate) const TEMP_PREFIX: &str = ".tmp-";

/// Backend seam consumed by collections and queries
///
/// All methods take `&self`; implementations must be safe to call from many
/// threads at once. Behavior after `close()` is backend-defined; the bundled
/// backends return `AtlasError::Closed`.
pub trait StorageEngine: Send + Sync {
    /// Store `payload` under (collection, id), creating the collection if
    /// needed and replacing any previous payload
    fn write(&self, collection: &str, id: &str, payload: &[u8]) -> Result<()>;

    /// Read the payload stored under (collection, id)
    ///
    /// Returns:
    /// - `Ok(Some(payload))`: document present
    /// - `Ok(None)`: document or collection absent
    fn read(&self, collection: &str, id: &str) -> Result<Option<Vec<u8>>>;

    /// Read every payload in a collection, in unspecified order
    ///
    /// An absent collection yields an empty `Vec`.
    fn read_all(&self, collection: &str) -> Result<Vec<Vec<u8>>>;

    /// Remove the payload under (collection, id); absent ids are a no-op
    fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Names of the collections currently holding storage
    fn collection_names(&self) -> Result<Vec<String>>;

    /// Release held resources
    fn close(&self) -> Result<()>;
}

/// Reject names that would not map to exactly one path component
///
/// Shared by every bundled engine so a name accepted by one is accepted by
/// all of them.
pub(crate) fn validate_component(kind: &'static str, name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.starts_with(TEMP_PREFIX)
        || name.chars().any(|c| c == '/' || c == '\\' || c == '\0');

    if invalid {
        return Err(AtlasError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}
