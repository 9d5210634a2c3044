//! The run pipeline: create root, load, analyze, delete, copy, persist.
//!
//! Phases are strictly sequential; each completes before the next begins.
//! Every deletion lands before the first copy, so a stale removal can never
//! collide with a fresh upload at the same name. Any failure aborts the run
//! and leaves the previous state file in place; the next run repairs itself
//! by re-comparing.

use std::io;
use std::path::{Path, PathBuf};

use upsync_core::checksum::local_checksum;
use upsync_core::paths::{child_path, under_root};
use upsync_core::{Checksum, SyncState};
use upsync_fs::{EntryKind, FileSystem, LocalFileSystem};

use crate::analyzer::{analyze, AnalysisSource};
use crate::error::{io_err, SyncError};
use crate::progress::Progress;

/// What a run needs besides the remote backend.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Local directory to mirror.
    pub local_dir: PathBuf,
    /// Where the keep map is persisted.
    pub state_file: PathBuf,
    /// Which side supplies listings during analysis.
    pub source: AnalysisSource,
}

/// Operation counts for one successful run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub deleted_files: usize,
    pub deleted_dirs: usize,
    pub copied_files: usize,
    pub created_dirs: usize,
    /// Paths verified unchanged and skipped.
    pub unchanged: usize,
}

impl SyncReport {
    /// Remote operations performed. Zero means the remote was already in
    /// sync.
    pub fn changes(&self) -> usize {
        self.deleted_files + self.deleted_dirs + self.copied_files + self.created_dirs
    }
}

/// Run a full sync of `opts.local_dir` onto `remote`.
///
/// The backend is closed on every exit path; a phase error takes precedence
/// over a close error.
pub fn sync(
    remote: &mut dyn FileSystem,
    opts: &SyncOptions,
    progress: &mut dyn Progress,
) -> Result<SyncReport, SyncError> {
    let outcome = run(remote, opts, progress);
    let closed = remote.close();
    let report = outcome?;
    closed?;
    Ok(report)
}

fn run(
    remote: &mut dyn FileSystem,
    opts: &SyncOptions,
    progress: &mut dyn Progress,
) -> Result<SyncReport, SyncError> {
    // Usually fails because the root already exists; any real problem
    // resurfaces on the first listing or transfer.
    if let Err(e) = remote.create_directory("/") {
        log::debug!("sync root not created: {e}");
    }

    let mut state = SyncState::load_or_create(&opts.state_file)?;
    analyze(remote, &opts.local_dir, &mut state, opts.source)?;

    let mut report = SyncReport::default();
    delete_phase(remote, &mut state, &mut report, progress)?;

    let mut copy = CopyPhase {
        remote,
        local: LocalFileSystem::new(&opts.local_dir),
        local_root: &opts.local_dir,
        state: &mut state,
        report: &mut report,
        progress,
    };
    copy.dir("/")?;

    state.save(&opts.state_file)?;
    log::info!(
        "sync finished: {} copied, {} created, {}+{} deleted, {} unchanged",
        report.copied_files,
        report.created_dirs,
        report.deleted_files,
        report.deleted_dirs,
        report.unchanged
    );
    Ok(report)
}

/// Consume the delete set in deletion order, deepest paths first.
fn delete_phase(
    remote: &mut dyn FileSystem,
    state: &mut SyncState,
    report: &mut SyncReport,
    progress: &mut dyn Progress,
) -> Result<(), SyncError> {
    let deletes = state.take_deletes();
    if deletes.is_empty() {
        return Ok(());
    }
    log::info!("removing {} stale remote paths", deletes.len());

    let total = deletes.len();
    for (done, entry) in deletes.iter().enumerate() {
        progress.item(done, total, entry.as_str());
        if entry.is_directory() {
            remote.delete_directory(entry.target())?;
            report.deleted_dirs += 1;
        } else {
            remote.delete_file(entry.target())?;
            report.deleted_files += 1;
        }
    }
    progress.end_batch();
    Ok(())
}

/// Walk of the local tree that uploads everything absent from the keep map.
/// Files in a directory are handled before its subdirectories.
struct CopyPhase<'a> {
    remote: &'a mut dyn FileSystem,
    local: LocalFileSystem,
    local_root: &'a Path,
    state: &'a mut SyncState,
    report: &'a mut SyncReport,
    progress: &'a mut dyn Progress,
}

impl CopyPhase<'_> {
    fn dir(&mut self, dir: &str) -> Result<(), SyncError> {
        let files = self.local.list(dir, EntryKind::File)?;
        let listed = files.len();
        let pending: Vec<String> = files
            .into_iter()
            .filter(|entry| self.state.tracked(&child_path(dir, &entry.name)).is_none())
            .map(|entry| entry.name)
            .collect();
        self.report.unchanged += listed - pending.len();

        let total = pending.len();
        for (done, name) in pending.iter().enumerate() {
            let path = child_path(dir, name);
            self.progress.item(done, total, &path);

            let local_path = under_root(self.local_root, &path);
            // Checksummed before upload: the state records the bytes this
            // run believes it copied.
            let sum = local_checksum(&local_path)
                .map_err(|e| io_err(&local_path, e))?
                .ok_or_else(|| {
                    io_err(
                        &local_path,
                        io::Error::new(io::ErrorKind::NotFound, "vanished before transfer"),
                    )
                })?;
            self.remote.put_file(&local_path, &path)?;
            self.state.track(path, sum);
            self.report.copied_files += 1;
        }
        if total > 0 {
            self.progress.end_batch();
        }

        for entry in self.local.list(dir, EntryKind::Directory)? {
            let path = child_path(dir, &entry.name);
            let tracked = self.state.tracked(&path).is_some();
            if tracked {
                self.report.unchanged += 1;
            } else {
                self.remote.create_directory(&path)?;
                self.report.created_dirs += 1;
            }
            self.dir(&path)?;
            // The directory's own entry lands after its whole subtree.
            if !tracked {
                self.state.track(path, Checksum::DIRECTORY);
            }
        }
        Ok(())
    }
}
