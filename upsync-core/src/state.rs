//! Sync state — the keep map and delete set persisted between runs.
//!
//! The keep map records, for every path the remote is expected to hold, the
//! checksum of the local bytes it was copied from (`0` for directories). The
//! delete set is rebuilt by each analysis and consumed by the delete phase;
//! it is never persisted.
//!
//! On disk the keep map is a line-oriented text file:
//!
//! ```text
//! 00000000062c0215 /a.txt
//! 0000000006a60229 /dir/b.txt
//! 0000000000000000 /dir
//! ```
//!
//! Lines appear in insertion order. Saves use the same atomic `.tmp` + rename
//! pattern as every other persisted file here.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::path::Path;

use indexmap::IndexMap;

use crate::checksum::Checksum;
use crate::error::{io_err, StateError};
use crate::paths::{parent_dir, STATE_FILE_EXT};

// ---------------------------------------------------------------------------
// DeletePath
// ---------------------------------------------------------------------------

/// A remote path scheduled for deletion. Directory entries carry a trailing
/// `/` so the delete phase knows which operation to issue.
///
/// The `Ord` impl yields deletion order: deeper paths first, ties broken
/// reverse-lexicographically. Because a directory's `/`-suffixed form is a
/// proper prefix of every entry directly inside it, those entries always
/// sort ahead of the directory itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePath(String);

impl DeletePath {
    /// Entry for a file at `path`.
    pub fn file(path: &str) -> Self {
        Self(path.to_owned())
    }

    /// Entry for the directory at `path` (no trailing `/` in the argument).
    pub fn directory(path: &str) -> Self {
        Self(format!("{path}/"))
    }

    pub fn is_directory(&self) -> bool {
        self.0.ends_with('/')
    }

    /// The path to hand to the remote operation, without the `/` suffix.
    pub fn target(&self) -> &str {
        self.0.strip_suffix('/').unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn depth(&self) -> usize {
        self.0.matches('/').count()
    }
}

impl fmt::Display for DeletePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Ord for DeletePath {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .depth()
            .cmp(&self.depth())
            .then_with(|| other.0.cmp(&self.0))
    }
}

impl PartialOrd for DeletePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// SyncState
// ---------------------------------------------------------------------------

/// In-memory sync state: keep map plus the delete set for the current run.
#[derive(Debug, Default)]
pub struct SyncState {
    keep: IndexMap<String, Checksum>,
    delete: BTreeSet<DeletePath>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    // -- keep map ----------------------------------------------------------

    /// Stored checksum for `path`, if it is tracked.
    pub fn tracked(&self, path: &str) -> Option<Checksum> {
        self.keep.get(path).copied()
    }

    /// Record `path` with `sum`. New paths append to the insertion order.
    pub fn track(&mut self, path: impl Into<String>, sum: Checksum) {
        self.keep.insert(path.into(), sum);
    }

    /// Drop `path` from the keep map. Remaining entries keep their relative
    /// order.
    pub fn untrack(&mut self, path: &str) -> Option<Checksum> {
        self.keep.shift_remove(path)
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.keep.is_empty()
    }

    /// Tracked entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Checksum)> {
        self.keep.iter().map(|(p, sum)| (p.as_str(), *sum))
    }

    /// Names of tracked files directly under `dir`.
    pub fn tracked_file_names_in(&self, dir: &str) -> Vec<String> {
        self.child_names_in(dir, false)
    }

    /// Names of tracked directories directly under `dir`.
    pub fn tracked_dir_names_in(&self, dir: &str) -> Vec<String> {
        self.child_names_in(dir, true)
    }

    fn child_names_in(&self, dir: &str, directories: bool) -> Vec<String> {
        let prefix_len = if dir == "/" { 1 } else { dir.len() + 1 };
        self.keep
            .iter()
            .filter(|(path, sum)| {
                sum.is_directory() == directories && parent_dir(path) == dir
            })
            .map(|(path, _)| path[prefix_len..].to_owned())
            .collect()
    }

    // -- delete set --------------------------------------------------------

    /// Schedule the file at `path` for remote deletion.
    pub fn schedule_file_delete(&mut self, path: &str) {
        self.delete.insert(DeletePath::file(path));
    }

    /// Schedule the directory at `path` for remote deletion.
    pub fn schedule_dir_delete(&mut self, path: &str) {
        self.delete.insert(DeletePath::directory(path));
    }

    /// Scheduled deletions in deletion order.
    pub fn deletes(&self) -> impl Iterator<Item = &DeletePath> {
        self.delete.iter()
    }

    /// Drain the delete set in deletion order.
    pub fn take_deletes(&mut self) -> Vec<DeletePath> {
        std::mem::take(&mut self.delete).into_iter().collect()
    }

    // -- persistence -------------------------------------------------------

    /// Load the state file at `path`.
    ///
    /// A missing file means an empty state; an empty file is created so the
    /// location is writable before any remote work happens.
    pub fn load_or_create(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            File::create(path).map_err(|e| io_err(path, e))?;
            return Ok(Self::new());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let mut state = Self::new();
        for (idx, line) in contents.lines().enumerate() {
            let malformed = || StateError::Malformed {
                path: path.to_path_buf(),
                line: idx + 1,
            };
            let (hex, entry_path) = line.split_once(' ').ok_or_else(malformed)?;
            let sum = Checksum::from_hex(hex).ok_or_else(malformed)?;
            if !entry_path.starts_with('/') {
                return Err(malformed());
            }
            state.keep.insert(entry_path.to_owned(), sum);
        }
        Ok(state)
    }

    /// Save the keep map to `path`, fully replacing the previous contents.
    ///
    /// Writes to `<path>.tmp` then renames to `<path>`.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let mut out = String::new();
        for (entry_path, sum) in &self.keep {
            out.push_str(&format!("{sum} {entry_path}\n"));
        }

        let tmp = path.with_extension(format!("{STATE_FILE_EXT}.tmp"));
        std::fs::write(&tmp, &out).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
