//! Local disk backend.
//!
//! Serves two roles: the listing source the analyzer walks the local tree
//! with, and a full backend for directory-to-directory syncs. A missing or
//! non-directory path lists as empty rather than failing, which is how the
//! analyzer probes directories that no longer exist on one side.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{local_io, FsError};
use crate::{is_nav_name, EntryKind, FileSystem, FsEntry};

/// Blocking backend rooted at a directory on this machine.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: PathBuf,
}

impl LocalFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let rel = path.trim_start_matches('/');
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }
}

impl FileSystem for LocalFileSystem {
    fn list(&mut self, dir: &str, kind: EntryKind) -> Result<Vec<FsEntry>, FsError> {
        let full = self.resolve(dir);
        match fs::metadata(&full) {
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(local_io(&full, e)),
            Ok(meta) if !meta.is_dir() => return Ok(Vec::new()),
            Ok(_) => {}
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&full).map_err(|e| local_io(&full, e))? {
            let entry = entry.map_err(|e| local_io(&full, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_nav_name(&name) {
                continue;
            }
            // Follows symlinks, so a link to a file syncs as that file.
            let meta = match fs::metadata(entry.path()) {
                Ok(meta) => meta,
                // Broken link: neither file nor directory.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(local_io(entry.path(), e)),
            };
            let matches = match kind {
                EntryKind::File => meta.is_file(),
                EntryKind::Directory => meta.is_dir(),
            };
            if matches {
                entries.push(FsEntry { name, kind });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn create_directory(&mut self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path);
        fs::create_dir_all(&full).map_err(|e| local_io(&full, e))
    }

    fn delete_file(&mut self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path);
        fs::remove_file(&full).map_err(|e| local_io(&full, e))
    }

    fn delete_directory(&mut self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path);
        fs::remove_dir(&full).map_err(|e| local_io(&full, e))
    }

    fn put_file(&mut self, source: &Path, dest: &str) -> Result<(), FsError> {
        let full = self.resolve(dest);
        fs::copy(source, &full).map(|_| ()).map_err(|e| local_io(&full, e))
    }

    fn get_file(&mut self, source: &str, dest: &Path) -> Result<(), FsError> {
        let full = self.resolve(source);
        fs::copy(&full, dest).map(|_| ()).map_err(|e| local_io(dest, e))
    }

    fn close(&mut self) -> Result<(), FsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn names(entries: &[FsEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn lists_files_and_directories_separately() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut lfs = LocalFileSystem::new(dir.path());
        let files = lfs.list("/", EntryKind::File).unwrap();
        let dirs = lfs.list("/", EntryKind::Directory).unwrap();

        assert_eq!(names(&files), ["a.txt", "b.txt"]);
        assert_eq!(names(&dirs), ["sub"]);
    }

    #[test]
    fn missing_directory_lists_empty() {
        let dir = TempDir::new().unwrap();
        let mut lfs = LocalFileSystem::new(dir.path());
        assert!(lfs.list("/nope", EntryKind::File).unwrap().is_empty());
        assert!(lfs.list("/nope", EntryKind::Directory).unwrap().is_empty());
    }

    #[test]
    fn file_path_lists_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("plain"), b"x").unwrap();
        let mut lfs = LocalFileSystem::new(dir.path());
        assert!(lfs.list("/plain", EntryKind::File).unwrap().is_empty());
    }

    #[test]
    fn put_then_get_copies_bytes() {
        let local = TempDir::new().unwrap();
        let remote = TempDir::new().unwrap();
        let source = local.path().join("in.bin");
        fs::write(&source, b"\x00\x01binary\xff").unwrap();

        let mut rfs = LocalFileSystem::new(remote.path());
        rfs.create_directory("/sub").unwrap();
        rfs.put_file(&source, "/sub/out.bin").unwrap();
        assert_eq!(
            fs::read(remote.path().join("sub/out.bin")).unwrap(),
            b"\x00\x01binary\xff"
        );

        let back = local.path().join("back.bin");
        rfs.get_file("/sub/out.bin", &back).unwrap();
        assert_eq!(fs::read(&back).unwrap(), b"\x00\x01binary\xff");
    }

    #[test]
    fn create_directory_creates_parents() {
        let dir = TempDir::new().unwrap();
        let mut lfs = LocalFileSystem::new(dir.path());
        lfs.create_directory("/a/b/c").unwrap();
        assert!(dir.path().join("a/b/c").is_dir());
    }

    #[test]
    fn delete_directory_refuses_a_populated_one() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/keep"), b"x").unwrap();

        let mut lfs = LocalFileSystem::new(dir.path());
        assert!(lfs.delete_directory("/sub").is_err());

        lfs.delete_file("/sub/keep").unwrap();
        lfs.delete_directory("/sub").unwrap();
        assert!(!dir.path().join("sub").exists());
    }

    #[test]
    fn root_resolves_to_the_base_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("only"), b"x").unwrap();
        let mut lfs = LocalFileSystem::new(dir.path());
        assert_eq!(names(&lfs.list("/", EntryKind::File).unwrap()), ["only"]);
    }
}
