//! # Client Components
//!
//! The client is split into a transport core and an orchestrating pipeline:
//!
//! ## Transport ([`transport`])
//! Sends one sealed request to the recognition service and classifies the
//! HTTP/network outcome. Knows nothing about encryption or tables.
//!
//! ## Response Unwrapper ([`envelope`])
//! Extracts the sealed `table` field from the response and opens it.
//!
//! ## Pipeline ([`pipeline`])
//! Runs the whole scan: seal, send, unwrap, resolve, flatten, persist,
//! on a background task with a single typed result.

pub mod envelope;
pub mod pipeline;
pub mod transport;

// Re-export for convenience
pub use pipeline::{ScanPipeline, ScanTask};
pub use transport::TransportClient;
