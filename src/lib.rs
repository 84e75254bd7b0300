//! # ScanSheet
//!
//! Ingestion pipeline for photographed paper forms: captured images are
//! sealed with AES-256-GCM, sent to a remote recognition service, and the
//! service's sealed JSON answer is flattened into a spreadsheet-compatible
//! CSV file.
//!
//! ## Modules
//!
//! - [`common`]: configuration, wire messages and the error taxonomy
//! - [`client`]: HTTP transport, response unwrapping and the scan pipeline
//! - [`processing`]: codec, shape resolution, flattening and persistence
//! - [`capture`]: format and size checks on images entering the pipeline
//! - [`utils`]: logging setup for binaries

pub mod capture;
pub mod client;
pub mod common;
pub mod processing;
pub mod utils;

pub use client::{ScanPipeline, ScanTask, TransportClient};
pub use common::config::PipelineConfig;
pub use common::error::PipelineError;
pub use processing::PersistedArtifact;
