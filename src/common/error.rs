//! # Error Taxonomy
//!
//! Typed errors for every stage of the ingestion pipeline. The taxonomy is
//! flat: each stage owns one enum, and [`PipelineError`] wraps them without
//! translating, so a caller can always tell a transport failure from a
//! crypto failure from a shape failure.
//!
//! Every variant renders a message fit to show to a user. None of them
//! carries the authorization token or key material.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Bad or missing configuration. Fatal before any network call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Encryption key is not valid base64: {0}")]
    KeyEncoding(String),

    #[error("Encryption key must be {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },

    #[error("Invalid configuration value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Authenticated encryption failures. Never transient.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Envelope failed authentication (tampered data or wrong key)")]
    Authentication,

    #[error("Envelope too short: {len} bytes, need at least {min}")]
    MalformedEnvelope { len: usize, min: usize },

    #[error("Plaintext of {0} bytes is too large to seal")]
    PlaintextTooLarge(usize),
}

/// Outcome of the single HTTP exchange with the recognition service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Could not reach the recognition service: {0}")]
    Connectivity(String),

    #[error("Recognition service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Recognition service returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Recognition service returned an empty response")]
    EmptyResponse,

    #[error("Response body is not valid UTF-8")]
    Decode,

    #[error("Recognition service response was cut off: {0}")]
    Interrupted(String),

    #[error("Recognition service exchange failed: {0}")]
    Protocol(String),

    #[error("Could not build request: {0}")]
    Request(String),
}

/// Problems with the JSON envelope around the encrypted table.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("Response is not a JSON object: {0}")]
    Malformed(String),

    #[error("Response has no string field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' is not valid base64: {reason}")]
    Base64Decode { field: &'static str, reason: String },
}

/// The decrypted table did not match any supported JSON shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("Table is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Unrecognized table shape: got {0}")]
    Unrecognized(JsonKind),

    #[error("No valid records found in array of encoded strings")]
    NoValidRecords,
}

/// Filesystem failures while writing, listing or deleting artifacts.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not an artifact of this store")]
    OutsideStore(PathBuf),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// The single terminal failure reported to the caller of the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CodecError),

    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Pipeline task ended abnormally: {0}")]
    Aborted(String),
}

/// The JSON type actually observed, for [`ShapeError::Unrecognized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

impl std::fmt::Display for JsonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        };
        f.write_str(name)
    }
}
