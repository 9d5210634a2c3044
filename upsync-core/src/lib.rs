//! Upsync core library — checksums, sync state, path rules, errors.
//!
//! Public API surface:
//! - [`checksum`] — Adler-32 and the [`Checksum`] value type
//! - [`state`] — [`SyncState`] keep map / delete set and its on-disk form
//! - [`paths`] — root-relative path helpers and the state file location
//! - [`error`] — [`StateError`]

pub mod checksum;
pub mod error;
pub mod paths;
pub mod state;

pub use checksum::Checksum;
pub use error::StateError;
pub use state::{DeletePath, SyncState};
