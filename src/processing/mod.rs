//! # Processing Stages
//!
//! Pure, synchronous stages of the ingestion pipeline.
//!
//! - [`codec`]: AES-256-GCM sealing and opening of envelopes
//! - [`shape`]: classification of the decrypted table into records
//! - [`flatten`]: union column set, cell formatting and CSV rendering
//! - [`artifact`]: atomic persistence and listing of generated tables

pub mod artifact;
pub mod codec;
pub mod flatten;
pub mod shape;

pub use artifact::{format_file_size, ArtifactStore, PersistedArtifact};
pub use codec::Codec;
pub use flatten::{flatten, Table};
pub use shape::{resolve, Record, RecordSet, Shape};
