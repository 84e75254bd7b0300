//! # Shape Resolver
//!
//! The recognition service does not commit to one response shape. The
//! decrypted table can arrive as any of:
//!
//! ```text
//! [{"a":1},{"a":2}]          array of records
//! {"a":1}                    single record
//! "[{\"a\":1}]"              JSON text encoded as a JSON string
//! ["{\"a\":1}","{\"a\":2}"]  array of JSON-encoded records
//! ```
//!
//! [`classify`] maps a parsed value onto exactly one [`Shape`], and
//! [`resolve`] turns that shape into an ordered [`RecordSet`]. An encoded
//! string is unwrapped at most once; a second level is rejected as
//! unrecognized.

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::common::error::{JsonKind, ShapeError};

/// One decoded JSON object: a single scanned form.
pub type Record = Map<String, Value>;

/// Records in response order.
pub type RecordSet = Vec<Record>;

/// How many encoded-string layers are unwrapped before giving up.
const MAX_ENCODED_DEPTH: usize = 1;

/// The closed set of shapes the decrypted table can take.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    ArrayOfRecords(Vec<Record>),
    SingleRecord(Record),
    EncodedString(String),
    ArrayOfEncodedStrings(Vec<String>),
    Unrecognized(JsonKind),
}

/// Classifies a parsed value. Checks run in a fixed order and the first
/// match wins, so `[]` is an (empty) array of records.
pub fn classify(value: Value) -> Shape {
    match value {
        Value::Array(items) if items.iter().all(Value::is_object) => Shape::ArrayOfRecords(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect(),
        ),
        Value::Object(record) => Shape::SingleRecord(record),
        Value::String(text) => Shape::EncodedString(text),
        Value::Array(items) if items.iter().all(Value::is_string) => Shape::ArrayOfEncodedStrings(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text),
                    _ => None,
                })
                .collect(),
        ),
        other => Shape::Unrecognized(JsonKind::of(&other)),
    }
}

/// Resolves decrypted table bytes into an ordered [`RecordSet`].
///
/// # Errors
/// - [`ShapeError::InvalidJson`]: the bytes are not JSON
/// - [`ShapeError::Unrecognized`]: valid JSON of an unsupported shape,
///   including a string nested inside an already-unwrapped string
/// - [`ShapeError::NoValidRecords`]: an array of encoded strings where no
///   element decoded to an object
pub fn resolve(plaintext: &[u8]) -> Result<RecordSet, ShapeError> {
    resolve_at_depth(plaintext, 0)
}

fn resolve_at_depth(plaintext: &[u8], depth: usize) -> Result<RecordSet, ShapeError> {
    let value: Value =
        serde_json::from_slice(plaintext).map_err(|e| ShapeError::InvalidJson(e.to_string()))?;

    match classify(value) {
        Shape::ArrayOfRecords(records) => {
            info!("✅ Found array of {} records", records.len());
            Ok(records)
        }
        Shape::SingleRecord(record) => {
            info!("✅ Found single record, wrapping as one-row table");
            Ok(vec![record])
        }
        Shape::EncodedString(text) => {
            if depth >= MAX_ENCODED_DEPTH {
                warn!("❌ Refusing to unwrap encoded string at depth {}", depth + 1);
                return Err(ShapeError::Unrecognized(JsonKind::String));
            }
            info!("🔄 Double-encoded JSON detected, decoding inner string");
            resolve_at_depth(text.as_bytes(), depth + 1)
        }
        Shape::ArrayOfEncodedStrings(items) => {
            info!("🔄 Array of {} encoded strings detected", items.len());
            let records = decode_records(&items);
            if records.is_empty() {
                return Err(ShapeError::NoValidRecords);
            }
            info!("✅ Decoded {} of {} records", records.len(), items.len());
            Ok(records)
        }
        Shape::Unrecognized(kind) => {
            warn!("❌ Unrecognized table shape: {}", kind);
            Err(ShapeError::Unrecognized(kind))
        }
    }
}

/// Decodes each string as a JSON object, skipping the ones that are not.
fn decode_records(items: &[String]) -> RecordSet {
    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match serde_json::from_str::<Value>(item) {
            Ok(Value::Object(record)) => records.push(record),
            Ok(other) => {
                warn!(
                    "⚠️  Skipping element {}: expected object, got {}",
                    index,
                    JsonKind::of(&other)
                );
            }
            Err(e) => {
                warn!("⚠️  Skipping element {}: not valid JSON ({})", index, e);
                debug!("{}", rejected_summary(index, item));
            }
        }
    }
    records
}

/// Log line for a rejected element. Elements carry form data, so only the
/// position and size are reported.
fn rejected_summary(index: usize, item: &str) -> String {
    format!("Rejected element {}: {} bytes", index, item.len())
}
