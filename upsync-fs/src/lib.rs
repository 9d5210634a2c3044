//! Filesystem backends behind one blocking interface.
//!
//! The sync engine addresses everything through root-relative POSIX paths
//! (`/dir/file.txt`); each backend resolves those against a base fixed at
//! construction. Local disk, FTP and SFTP all implement [`FileSystem`], so
//! the engine never branches on which one it is driving.

pub mod error;
pub mod ftp;
pub mod local;
pub mod sftp;

use std::path::{Path, PathBuf};

pub use error::FsError;
pub use ftp::FtpFileSystem;
pub use local::LocalFileSystem;
pub use sftp::SftpFileSystem;

// ---------------------------------------------------------------------------
// Listing entries
// ---------------------------------------------------------------------------

/// What a listing entry is, and what [`FileSystem::list`] filters by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A named entry directly under a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl FsEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }
}

/// Credentials for a remote session.
#[derive(Debug, Clone)]
pub enum Auth {
    Password(String),
    /// Private key file. Only the SFTP backend accepts this.
    Identity(PathBuf),
}

// ---------------------------------------------------------------------------
// The backend contract
// ---------------------------------------------------------------------------

/// Uniform blocking interface over local disk, FTP and SFTP.
///
/// Remote arguments are root-relative POSIX paths; `&Path` arguments are
/// real paths on this machine. Listings are sorted by name and never
/// contain `.` or `..`.
pub trait FileSystem {
    /// Entries of `kind` directly under `dir`.
    fn list(&mut self, dir: &str, kind: EntryKind) -> Result<Vec<FsEntry>, FsError>;

    /// Create the directory at `path`. How an existing path is treated is
    /// protocol-specific; callers own the already-exists case where they
    /// tolerate it.
    fn create_directory(&mut self, path: &str) -> Result<(), FsError>;

    /// Remove the file at `path`.
    fn delete_file(&mut self, path: &str) -> Result<(), FsError>;

    /// Remove the directory at `path`, which must already be empty.
    fn delete_directory(&mut self, path: &str) -> Result<(), FsError>;

    /// Upload the local file at `source` to `dest`, byte for byte.
    fn put_file(&mut self, source: &Path, dest: &str) -> Result<(), FsError>;

    /// Download the file at `source` to the local path `dest`, byte for byte.
    fn get_file(&mut self, source: &str, dest: &Path) -> Result<(), FsError>;

    /// Release the session or handle. Called once, after the last operation.
    fn close(&mut self) -> Result<(), FsError>;
}

// ---------------------------------------------------------------------------
// Shared path plumbing
// ---------------------------------------------------------------------------

/// Resolve a root-relative path against a remote base directory.
///
/// The base's trailing slashes are stripped first, so a base of `/` (or an
/// empty base, meaning the server's login directory) composes cleanly. The
/// result keeps no trailing slash unless it is `/` itself.
pub(crate) fn join_remote(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let mut joined = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };
    while joined.len() > 1 && joined.ends_with('/') {
        joined.pop();
    }
    joined
}

/// Listing entries named `.` or `..` are navigation, not content.
pub(crate) fn is_nav_name(name: &str) -> bool {
    name == "." || name == ".."
}
