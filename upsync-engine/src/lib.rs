//! One-way directory sync engine.
//!
//! [`sync`] drives a full run against any [`upsync_fs::FileSystem`] backend:
//! best-effort root creation, state load, analysis, deletions deepest-first,
//! copy, state persist. [`analyze`] is exposed separately for callers that
//! only want the classification pass.

pub mod analyzer;
pub mod error;
pub mod pipeline;
pub mod progress;

pub use analyzer::{analyze, AnalysisSource};
pub use error::SyncError;
pub use pipeline::{sync, SyncOptions, SyncReport};
pub use progress::{NullProgress, Progress};
