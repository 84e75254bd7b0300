//! # Transport Client
//!
//! Performs the single HTTP exchange with the recognition service and
//! classifies its outcome.
//!
//! ## Responsibility
//!
//! The [`TransportClient`] only moves bytes:
//! - wrap the sealed request as `{"payload": "<base64>"}`
//! - POST it with the static bearer token and a fixed timeout
//! - turn the outcome into a body string or a [`TransportError`]
//!
//! It does not seal, open or interpret anything, and it never retries.

use log::{debug, error, info};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

use crate::common::error::TransportError;
use crate::common::messages::RequestEnvelope;

/// HTTP client bound to one endpoint, token and timeout.
#[derive(Clone)]
pub struct TransportClient {
    http: Client,
    endpoint: String,
    authorization: HeaderValue,
    timeout: Duration,
}

impl TransportClient {
    /// Creates a client for `endpoint`.
    ///
    /// # Errors
    /// [`TransportError::Request`] if the token cannot be sent as a header
    /// value or the HTTP client cannot be built.
    pub fn new(endpoint: &str, auth_token: &str, timeout: Duration) -> Result<Self, TransportError> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", auth_token.trim()))
            .map_err(|_| {
                TransportError::Request("authorization token contains invalid characters".to_string())
            })?;
        authorization.set_sensitive(true);

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            authorization,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends a sealed request and returns the raw response body.
    ///
    /// Exactly one outbound call is made.
    ///
    /// # Errors
    /// - [`TransportError::Timeout`]: no complete answer within the timeout
    /// - [`TransportError::Connectivity`]: the service could not be reached
    /// - [`TransportError::HttpStatus`]: status outside 200..=299
    /// - [`TransportError::EmptyResponse`]: success status with no body
    /// - [`TransportError::Decode`]: body is not UTF-8
    /// - [`TransportError::Interrupted`]: the body stopped before it was complete
    /// - [`TransportError::Protocol`]: the service answered with something
    ///   unusable, such as a redirect loop
    pub async fn send(&self, sealed_request: &[u8]) -> Result<String, TransportError> {
        let envelope = RequestEnvelope::wrap(sealed_request);
        info!(
            "📤 Sending {} byte sealed request to {}",
            sealed_request.len(),
            self.endpoint
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, self.authorization.clone())
            .json(&envelope)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        info!("📥 Response status: {}", status);
        if !status.is_success() {
            error!("❌ Recognition service returned HTTP {}", status.as_u16());
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        debug!("Response body: {} bytes", body.len());
        if body.is_empty() {
            return Err(TransportError::EmptyResponse);
        }

        String::from_utf8(body.to_vec()).map_err(|_| TransportError::Decode)
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            error!("❌ Request timed out after {:?}", self.timeout);
            return TransportError::Timeout(self.timeout);
        }
        let e = e.without_url();
        let reason = e.to_string();
        if e.is_builder() {
            return TransportError::Request(reason);
        }
        if e.is_connect() || e.is_request() {
            error!("❌ Request failed: {}", reason);
            return TransportError::Connectivity(reason);
        }
        if e.is_body() || e.is_decode() {
            error!("❌ Response body could not be read: {}", reason);
            return TransportError::Interrupted(reason);
        }
        error!("❌ Exchange with recognition service failed: {}", reason);
        TransportError::Protocol(reason)
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("endpoint", &self.endpoint)
            .field("authorization", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
