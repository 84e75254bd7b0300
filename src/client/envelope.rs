//! # Response Unwrapper
//!
//! Pulls the sealed table out of the service's `{"table": "<base64>"}`
//! response and opens it. Codec failures pass through untouched so callers
//! can tell a tampered envelope from a broken response body.

use base64::{engine::general_purpose, Engine as _};
use log::debug;
use serde_json::Value;

use crate::common::error::{EnvelopeError, JsonKind, PipelineError};
use crate::common::messages::TABLE_FIELD;
use crate::processing::codec::Codec;

/// Extracts, base64-decodes and decrypts the `table` field of a response.
///
/// Returns the plaintext table bytes unmodified.
pub fn unwrap_table(body: &str, codec: &Codec) -> Result<Vec<u8>, PipelineError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(EnvelopeError::Malformed(format!("got {}", JsonKind::of(&other))).into())
        }
    };

    let encoded = object
        .get(TABLE_FIELD)
        .and_then(Value::as_str)
        .ok_or(EnvelopeError::MissingField(TABLE_FIELD))?;

    let sealed = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| EnvelopeError::Base64Decode {
            field: TABLE_FIELD,
            reason: e.to_string(),
        })?;
    debug!("Sealed table: {} bytes", sealed.len());

    Ok(codec.open(&sealed)?)
}
