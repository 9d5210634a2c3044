//! Error types for upsync-engine.

use std::path::PathBuf;

use thiserror::Error;

use upsync_core::StateError;
use upsync_fs::FsError;

/// All errors a sync run can end with. Every one aborts the run; the state
/// file on disk stays whatever the last successful run left there.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A backend operation failed.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// The state file could not be read, parsed or written.
    #[error(transparent)]
    State(#[from] StateError),

    /// A local file could not be read while checksumming.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
