//! Two-tier cache for per-sequence gait analysis results.
//!
//! Lookups consult the [`gaitstore_store::StructuredStore`] first and fall
//! back to a TTL-bounded [`FileCache`] kept in the storage root. The
//! [`AnalysisService`] sits in front and computes results on a miss.

mod file_cache;
mod result_cache;
mod service;
mod statistics;

pub use file_cache::FileCache;
pub use result_cache::{CacheTier, CachedResult, ResultCache};
pub use service::{AnalysisOutcome, AnalysisService, GaitAnalyzer, PoseSource, ResultSource};
pub use statistics::{CacheStatistics, StatsContainer};
