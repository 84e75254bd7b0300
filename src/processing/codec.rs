//! # Envelope Codec
//!
//! AES-256-GCM authenticated encryption of opaque payloads.
//!
//! ## Envelope Layout
//!
//! ```text
//! [12 bytes: random nonce] [N bytes: ciphertext] [16 bytes: GCM tag]
//! ```
//!
//! A fresh nonce is drawn from the OS RNG for every [`Codec::seal`] call and
//! travels inside the envelope, so [`Codec::open`] needs nothing but the key.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::{engine::general_purpose, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::common::error::{CodecError, ConfigError};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Stateless sealer/opener bound to one symmetric key.
#[derive(Clone)]
pub struct Codec {
    cipher: Aes256Gcm,
}

impl Codec {
    /// Builds a codec from raw key bytes.
    pub fn new(key: &[u8]) -> Result<Self, ConfigError> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| ConfigError::KeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        })?;
        Ok(Self { cipher })
    }

    /// Builds a codec from the base64 key stored in configuration.
    ///
    /// Any failure here is a [`ConfigError`]; the pipeline must not attempt a
    /// request without a usable key.
    pub fn from_base64_key(encoded: &str) -> Result<Self, ConfigError> {
        let key = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| ConfigError::KeyEncoding(e.to_string()))?;
        Self::new(&key)
    }

    /// Encrypts `plaintext` into a self-contained envelope.
    ///
    /// Only fails when the plaintext exceeds the AES-GCM message limit.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CodecError::PlaintextTooLarge(plaintext.len()))?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);
        Ok(envelope)
    }

    /// Decrypts and authenticates an envelope produced by [`Codec::seal`].
    ///
    /// # Errors
    /// - [`CodecError::MalformedEnvelope`]: shorter than nonce + tag
    /// - [`CodecError::Authentication`]: tag does not verify
    pub fn open(&self, envelope: &[u8]) -> Result<Vec<u8>, CodecError> {
        let min = NONCE_LEN + TAG_LEN;
        if envelope.len() < min {
            return Err(CodecError::MalformedEnvelope {
                len: envelope.len(),
                min,
            });
        }

        let (nonce_bytes, ciphertext) = envelope.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CodecError::Authentication)
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec").field("key", &"<redacted>").finish()
    }
}
