//! # Configuration
//!
//! TOML configuration for the scan pipeline: where the recognition service
//! lives, how to authenticate, which key seals the exchange, and where
//! generated tables are stored.
//!
//! ## Example TOML
//!
//! ```toml
//! [service]
//! endpoint = "https://scansheet-api.onrender.com/process-image"
//! auth_token = "secret-token"
//! timeout_secs = 60
//!
//! [crypto]
//! key_base64 = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8="
//!
//! [output]
//! directory = "./documents"
//!
//! [scan]
//! title = "outros"
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use super::error::ConfigError;

/// Fixed transport timeout when the configuration does not override it.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Title the service expects when the user did not pick a form type.
pub const DEFAULT_TITLE: &str = "outros";

/// File name prefix of generated tables.
pub const DEFAULT_FILE_PREFIX: &str = "ficha_cadastro_";

/// Upper bound on a single image handed to the pipeline (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Example
/// ```ignore
/// let config: PipelineConfig = load_config("config/scansheet.toml")?;
/// ```
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Complete pipeline configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub service: ServiceConfig,
    pub crypto: CryptoConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Remote recognition service.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Full URL the request is POSTed to
    pub endpoint: String,
    /// Static token sent as `Authorization: Bearer <token>`
    pub auth_token: String,
    /// Single attempt timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Symmetric key material.
#[derive(Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// Base64-encoded 32-byte AES-256 key
    pub key_base64: String,
}

/// Where generated tables land.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Application-private documents directory
    pub directory: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

/// Request defaults supplied by the capture side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl PipelineConfig {
    /// Loads the pipeline configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        load_config(path)
    }

    /// Checks values that would otherwise only fail deep inside the pipeline.
    ///
    /// Key material is checked separately by
    /// [`Codec::from_base64_key`](crate::processing::codec::Codec::from_base64_key).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "service.endpoint",
                reason: "must not be empty".to_string(),
            });
        }
        if self.service.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "service.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.output.file_prefix.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                field: "output.file_prefix",
                reason: "must not contain path separators".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("auth_token", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl fmt::Debug for CryptoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoConfig")
            .field("key_base64", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("service", &self.service)
            .field("crypto", &self.crypto)
            .field("output", &self.output)
            .field("scan", &self.scan)
            .finish()
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_file_prefix() -> String {
    DEFAULT_FILE_PREFIX.to_string()
}

fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}
