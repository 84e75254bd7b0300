//! # Common Components
//!
//! Shared data structures used by the transport client and the processing stages.
//!
//! ## Modules
//!
//! - [`messages`]: JSON envelopes exchanged with the recognition service
//! - [`config`]: Configuration parsing utilities
//! - [`error`]: Typed error taxonomy for every pipeline stage

pub mod config;
pub mod error;
pub mod messages;
