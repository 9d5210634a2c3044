//! Error types for upsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from state persistence.
#[derive(Debug, Error)]
pub enum StateError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A state file line that does not match `<16 hex digits> <path>`.
    #[error("malformed state file {path} at line {line}")]
    Malformed { path: PathBuf, line: usize },
}

/// Convenience constructor for [`StateError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.into(),
        source,
    }
}
