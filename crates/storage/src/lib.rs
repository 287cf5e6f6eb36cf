//! Flat-file storage for gaitstore
//!
//! A [`StorageManager`] maps logical keys such as `features/gavd/seq_001`
//! onto artifacts written by one of the registered [`FormatBackend`]s:
//!
//! - `json`: pretty JSON, `.json`, gzip-compressed as `.json.gz`
//! - `binary`: bincode, `.bin`, zstd-compressed as `.bin.zst`
//!
//! Every write is atomic (temp file + rename) and may carry a
//! `.meta.json` sidecar that is deleted together with its data.

pub mod backend;
pub mod compression;
pub mod manager;
pub mod metadata;

pub use backend::{Artifact, BinaryBackend, FormatBackend, JsonBackend};
pub use compression::{Codec, CompressionConfig};
pub use manager::{SaveOptions, StorageManager};
pub use metadata::StorageMetadata;
