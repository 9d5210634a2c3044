//! Analysis pass: classify every tracked path as kept or stale.
//!
//! The walk reads listings from the analysis source (local tree by default,
//! remote listing on forced runs) and always checksums against local bytes.
//! It only ever removes keep entries and schedules deletions; new paths are
//! picked up later by the copy phase.
//!
//! The delete set never receives a path the remote is not known to hold:
//! under a local source that means tracked paths, under a remote source it
//! means listed ones. A brand-new local file is therefore never scheduled
//! for deletion, and a tracked path the remote has lost is dropped from the
//! keep map without a delete so the copy phase re-uploads it.

use std::path::Path;

use upsync_core::checksum::local_checksum;
use upsync_core::paths::{child_path, under_root};
use upsync_core::SyncState;
use upsync_fs::{EntryKind, FileSystem, FsEntry, LocalFileSystem};

use crate::error::{io_err, SyncError};

/// Which side supplies directory listings during analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnalysisSource {
    /// Walk the local tree. The default for every run.
    #[default]
    Local,
    /// Walk the remote listing; a forced run. Foreign remote paths become
    /// deletions, tracked paths the remote lost become re-uploads.
    Remote,
}

/// Walk the tree from `/`, pruning the keep map and filling the delete set.
///
/// Returns true iff the subtree keeps at least one entry.
pub fn analyze(
    remote: &mut dyn FileSystem,
    local_root: &Path,
    state: &mut SyncState,
    source: AnalysisSource,
) -> Result<bool, SyncError> {
    match source {
        AnalysisSource::Local => {
            let mut local = LocalFileSystem::new(local_root);
            walk(&mut local, source, local_root, state, "/", true)
        }
        AnalysisSource::Remote => walk(remote, source, local_root, state, "/", true),
    }
}

/// One directory level. `present` says whether `dir` appeared in its
/// parent's source listing; absent directories are walked without listing,
/// classifying their tracked descendants against the local disk only.
fn walk(
    source_fs: &mut dyn FileSystem,
    source: AnalysisSource,
    local_root: &Path,
    state: &mut SyncState,
    dir: &str,
    present: bool,
) -> Result<bool, SyncError> {
    let (listed_files, listed_dirs) = if present {
        (
            source_fs.list(dir, EntryKind::File)?,
            source_fs.list(dir, EntryKind::Directory)?,
        )
    } else {
        (Vec::new(), Vec::new())
    };

    let mut kept = false;

    for (name, listed) in considered(&listed_files, state.tracked_file_names_in(dir)) {
        let path = child_path(dir, &name);
        // Only a file entry counts as "stored" here; a directory marker at
        // this path belongs to the directory pass below.
        let stored = state.tracked(&path).filter(|sum| !sum.is_directory());
        let local_path = under_root(local_root, &path);
        let local = local_checksum(&local_path).map_err(|e| io_err(&local_path, e))?;

        if listed && stored.is_some() && stored == local {
            kept = true;
            continue;
        }

        if stored.is_some() {
            state.untrack(&path);
        }
        let known_remote = match source {
            AnalysisSource::Local => stored.is_some(),
            AnalysisSource::Remote => listed,
        };
        if known_remote {
            log::debug!("stale file {path}");
            state.schedule_file_delete(&path);
        }
    }

    for (name, listed) in considered(&listed_dirs, state.tracked_dir_names_in(dir)) {
        let path = child_path(dir, &name);
        if walk(source_fs, source, local_root, state, &path, listed)? {
            kept = true;
            continue;
        }

        // Nothing kept below: the directory itself is stale. Scheduling
        // happens here, in the parent, so the sync root is never scheduled.
        let stored = state.tracked(&path).filter(|sum| sum.is_directory());
        if stored.is_some() {
            state.untrack(&path);
        }
        let known_remote = match source {
            AnalysisSource::Local => stored.is_some(),
            AnalysisSource::Remote => listed,
        };
        if known_remote {
            log::debug!("stale directory {path}");
            state.schedule_dir_delete(&path);
        }
    }

    Ok(kept)
}

/// Union of the source listing and the tracked names, tagged with whether
/// each name was listed. Listed names come first, in listing order.
fn considered(listed: &[FsEntry], tracked: Vec<String>) -> Vec<(String, bool)> {
    let mut names: Vec<(String, bool)> = listed
        .iter()
        .map(|entry| (entry.name.clone(), true))
        .collect();
    for name in tracked {
        if !names.iter().any(|(listed_name, _)| *listed_name == name) {
            names.push((name, false));
        }
    }
    names
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;
    use upsync_core::checksum::checksum_bytes;
    use upsync_core::Checksum;

    use super::*;

    fn write(base: &Path, rel: &str, contents: &str) {
        let path = base.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn track_file(state: &mut SyncState, path: &str, contents: &str) {
        state.track(path, checksum_bytes(contents.as_bytes()));
    }

    fn delete_order(state: &SyncState) -> Vec<String> {
        state.deletes().map(|d| d.as_str().to_owned()).collect()
    }

    fn analyze_local(local: &TempDir, state: &mut SyncState) -> bool {
        // The remote side is never consulted under a local source.
        let unused = TempDir::new().unwrap();
        let mut remote = LocalFileSystem::new(unused.path());
        analyze(&mut remote, local.path(), state, AnalysisSource::Local).unwrap()
    }

    #[test]
    fn matching_tree_keeps_everything() {
        let local = TempDir::new().unwrap();
        write(local.path(), "a.txt", "hello");
        write(local.path(), "dir/b.txt", "world");

        let mut state = SyncState::new();
        track_file(&mut state, "/a.txt", "hello");
        track_file(&mut state, "/dir/b.txt", "world");
        state.track("/dir", Checksum::DIRECTORY);

        assert!(analyze_local(&local, &mut state));
        assert!(delete_order(&state).is_empty());
        assert_eq!(state.iter().count(), 3);
    }

    #[test]
    fn new_local_files_are_not_scheduled() {
        let local = TempDir::new().unwrap();
        write(local.path(), "fresh.txt", "new");
        write(local.path(), "sub/inner.txt", "new");

        let mut state = SyncState::new();
        analyze_local(&local, &mut state);

        assert!(delete_order(&state).is_empty());
        assert!(state.is_empty(), "analysis never adds keep entries");
    }

    #[test]
    fn changed_file_is_scheduled_and_untracked() {
        let local = TempDir::new().unwrap();
        write(local.path(), "a.txt", "changed bytes");

        let mut state = SyncState::new();
        track_file(&mut state, "/a.txt", "original bytes");

        assert!(!analyze_local(&local, &mut state));
        assert_eq!(delete_order(&state), ["/a.txt"]);
        assert_eq!(state.tracked("/a.txt"), None);
    }

    #[test]
    fn missing_file_is_scheduled_and_untracked() {
        let local = TempDir::new().unwrap();
        write(local.path(), "keep.txt", "stays");

        let mut state = SyncState::new();
        track_file(&mut state, "/keep.txt", "stays");
        track_file(&mut state, "/gone.txt", "was here");

        assert!(analyze_local(&local, &mut state));
        assert_eq!(delete_order(&state), ["/gone.txt"]);
        assert_eq!(state.tracked("/gone.txt"), None);
        assert!(state.tracked("/keep.txt").is_some());
    }

    #[test]
    fn emptied_directory_is_pruned_children_first() {
        let local = TempDir::new().unwrap();
        write(local.path(), "a.txt", "hello");
        fs::create_dir(local.path().join("dir")).unwrap();

        let mut state = SyncState::new();
        track_file(&mut state, "/a.txt", "hello");
        track_file(&mut state, "/dir/b.txt", "world");
        state.track("/dir", Checksum::DIRECTORY);

        assert!(analyze_local(&local, &mut state));
        assert_eq!(delete_order(&state), ["/dir/b.txt", "/dir/"]);
        assert_eq!(state.tracked("/dir"), None);
    }

    #[test]
    fn missing_tree_is_pruned_deepest_first() {
        let local = TempDir::new().unwrap();

        let mut state = SyncState::new();
        state.track("/x", Checksum::DIRECTORY);
        state.track("/x/y", Checksum::DIRECTORY);
        track_file(&mut state, "/x/y/f.txt", "deep");

        assert!(!analyze_local(&local, &mut state));
        assert_eq!(delete_order(&state), ["/x/y/f.txt", "/x/y/", "/x/"]);
        assert!(state.is_empty());
    }

    #[test]
    fn empty_tracked_directory_is_stale() {
        // A directory keeps itself only through kept descendants, so an
        // empty one is removed and recreated by the copy phase each run.
        let local = TempDir::new().unwrap();
        fs::create_dir(local.path().join("empty")).unwrap();

        let mut state = SyncState::new();
        state.track("/empty", Checksum::DIRECTORY);

        assert!(!analyze_local(&local, &mut state));
        assert_eq!(delete_order(&state), ["/empty/"]);
    }

    #[test]
    fn root_is_never_scheduled() {
        let local = TempDir::new().unwrap();

        let mut state = SyncState::new();
        track_file(&mut state, "/only.txt", "gone now");

        assert!(!analyze_local(&local, &mut state));
        assert_eq!(delete_order(&state), ["/only.txt"]);
    }

    #[test]
    fn remote_listing_schedules_foreign_paths() {
        let local = TempDir::new().unwrap();
        write(local.path(), "mine.txt", "local");

        let remote_dir = TempDir::new().unwrap();
        write(remote_dir.path(), "foreign.txt", "who put this here");
        write(remote_dir.path(), "junk/leftover.txt", "aborted run");

        let mut state = SyncState::new();
        let mut remote = LocalFileSystem::new(remote_dir.path());
        analyze(&mut remote, local.path(), &mut state, AnalysisSource::Remote).unwrap();

        assert_eq!(
            delete_order(&state),
            ["/junk/leftover.txt", "/junk/", "/foreign.txt"]
        );
        assert!(state.is_empty());
    }

    #[test]
    fn remote_listing_keeps_verified_tracked_files() {
        let local = TempDir::new().unwrap();
        write(local.path(), "a.txt", "hello");

        let remote_dir = TempDir::new().unwrap();
        write(remote_dir.path(), "a.txt", "hello");

        let mut state = SyncState::new();
        track_file(&mut state, "/a.txt", "hello");

        let mut remote = LocalFileSystem::new(remote_dir.path());
        let kept =
            analyze(&mut remote, local.path(), &mut state, AnalysisSource::Remote).unwrap();

        assert!(kept);
        assert!(delete_order(&state).is_empty());
        assert!(state.tracked("/a.txt").is_some());
    }

    #[test]
    fn remote_listing_drops_lost_tracked_files_without_delete() {
        let local = TempDir::new().unwrap();
        write(local.path(), "a.txt", "hello");

        let remote_dir = TempDir::new().unwrap(); // remote lost the file

        let mut state = SyncState::new();
        track_file(&mut state, "/a.txt", "hello");

        let mut remote = LocalFileSystem::new(remote_dir.path());
        analyze(&mut remote, local.path(), &mut state, AnalysisSource::Remote).unwrap();

        assert!(delete_order(&state).is_empty(), "nothing to delete remotely");
        assert_eq!(state.tracked("/a.txt"), None, "re-uploaded by the copy phase");
    }

    #[test]
    fn file_replacing_a_tracked_directory_heals() {
        let local = TempDir::new().unwrap();
        write(local.path(), "x", "now a file");

        let mut state = SyncState::new();
        state.track("/x", Checksum::DIRECTORY);
        track_file(&mut state, "/x/f.txt", "old content");

        assert!(!analyze_local(&local, &mut state));
        // The remote holds a file at /x/f.txt and a directory at /x, so
        // those are exactly the operations scheduled.
        assert_eq!(delete_order(&state), ["/x/f.txt", "/x/"]);
        assert!(state.is_empty());
    }

    #[test]
    fn directory_replacing_a_tracked_file_heals() {
        let local = TempDir::new().unwrap();
        write(local.path(), "y/inner.txt", "fresh");

        let mut state = SyncState::new();
        track_file(&mut state, "/y", "used to be a file");

        assert!(!analyze_local(&local, &mut state));
        // Only the remote file is deleted; the new directory and its
        // contents are the copy phase's job.
        assert_eq!(delete_order(&state), ["/y"]);
        assert!(state.is_empty());
    }

    #[test]
    fn considered_unions_listing_and_tracked_names() {
        let listed = [FsEntry::file("a"), FsEntry::file("b")];
        let union = considered(&listed, vec!["b".to_owned(), "c".to_owned()]);
        assert_eq!(
            union,
            [
                ("a".to_owned(), true),
                ("b".to_owned(), true),
                ("c".to_owned(), false),
            ]
        );
    }
}
