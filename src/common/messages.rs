//! # Wire Messages
//!
//! JSON bodies exchanged with the recognition service.
//!
//! ```text
//! outbound: {"payload": "<base64 of nonce || ciphertext || tag>"}
//!           where the sealed plaintext is {"image_bytes": [...], "title": "..."}
//! inbound:  {"table":   "<base64 of nonce || ciphertext || tag>"}
//! ```

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// Name of the inbound field holding the sealed table.
pub const TABLE_FIELD: &str = "table";

/// Plaintext request, sealed before it leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Each captured image, base64-encoded, in capture order
    pub image_bytes: Vec<String>,
    /// Form type the service should extract
    pub title: String,
}

impl ScanRequest {
    /// Builds the request from raw image buffers, preserving their order.
    pub fn from_images(images: &[Vec<u8>], title: &str) -> Self {
        Self {
            image_bytes: images
                .iter()
                .map(|image| general_purpose::STANDARD.encode(image))
                .collect(),
            title: title.to_string(),
        }
    }

    /// Serialize to the JSON bytes that get sealed.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Outbound envelope around the sealed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub payload: String,
}

impl RequestEnvelope {
    pub fn wrap(sealed: &[u8]) -> Self {
        Self {
            payload: general_purpose::STANDARD.encode(sealed),
        }
    }
}

/// Inbound envelope around the sealed table. Used by tests and mock servers;
/// the client itself reads the body generically so it can tell a missing
/// field apart from a malformed body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub table: String,
}

impl ResponseEnvelope {
    pub fn wrap(sealed: &[u8]) -> Self {
        Self {
            table: general_purpose::STANDARD.encode(sealed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_request_keeps_image_order_and_title() {
        let request = ScanRequest::from_images(&[b"first".to_vec(), b"second".to_vec()], "outros");
        let json: serde_json::Value = serde_json::from_slice(&request.to_bytes().unwrap()).unwrap();
        assert_eq!(json["title"], "outros");
        assert_eq!(json["image_bytes"][0], "Zmlyc3Q=");
        assert_eq!(json["image_bytes"][1], "c2Vjb25k");
    }

    #[test]
    fn test_request_envelope_shape() {
        let envelope = RequestEnvelope::wrap(&[0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"payload":"3q2+7w=="}"#);
    }
}
