//! Document codec
//!
//! Encoding and decoding of documents to the bytes stored on disk.
//!
//! ## Format
//! The payload is the bincode encoding of the document map (varint integers,
//! little endian), with no header, footer or checksum:
//! ```text
//! ┌──────────────┬──────────┬─────────┬──────────┬─────────┬─────┐
//! │ EntryCount   │ Key (1)  │ Value(1)│ Key (2)  │ Value(2)│ ... │
//! └──────────────┴──────────┴─────────┴──────────┴─────────┴─────┘
//! ```
//! Each value is a variant tag followed by its content; arrays and objects
//! nest recursively.

use bincode::Options;

use crate::document::{Document, Value};
use crate::error::{AtlasError, Result};

/// Maximum encoded document size (16 MB)
pub const MAX_PAYLOAD_SIZE: u64 = 16 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_PAYLOAD_SIZE)
        .reject_trailing_bytes()
}

/// Encode a document to bytes
///
/// Fails with `UnsupportedValue` for non-finite floats anywhere in the
/// document, or if the encoded form would exceed `MAX_PAYLOAD_SIZE`.
pub fn encode(document: &Document) -> Result<Vec<u8>> {
    validate(document)?;

    options()
        .serialize(document)
        .map_err(|e| AtlasError::UnsupportedValue {
            field: String::new(),
            reason: e.to_string(),
        })
}

/// Decode a document from bytes
///
/// Fails with `CorruptPayload` when the bytes are not exactly one encoded
/// document.
pub fn decode(bytes: &[u8]) -> Result<Document> {
    options()
        .deserialize::<Document>(bytes)
        .map_err(|e| AtlasError::CorruptPayload(e.to_string()))
}

/// Check every field of a document can be encoded
pub fn validate(document: &Document) -> Result<()> {
    for (key, value) in document {
        validate_value(key, value)?;
    }
    Ok(())
}

fn validate_value(path: &str, value: &Value) -> Result<()> {
    match value {
        Value::Float(x) if !x.is_finite() => Err(AtlasError::UnsupportedValue {
            field: path.to_string(),
            reason: format!("non-finite float {}", x),
        }),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| validate_value(&format!("{}.{}", path, i), item)),
        Value::Object(map) => map
            .iter()
            .try_for_each(|(key, item)| validate_value(&format!("{}.{}", path, key), item)),
        _ => Ok(()),
    }
}
