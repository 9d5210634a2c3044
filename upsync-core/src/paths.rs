//! Path rules: root-relative sync paths and the state file location.
//!
//! The engine addresses everything by POSIX paths rooted at the sync root
//! (`/a.txt`, `/dir/b.txt`). The state file lives *beside* the local
//! directory, never inside it, so a sync can never sweep up its own state.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Extension of the persisted state file.
pub const STATE_FILE_EXT: &str = "sync";

/// Replace every character outside `[0-9A-Za-z.]` with `-`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '-' })
        .collect()
}

/// Location of the state file for syncing `local_dir` to `remote_dir` on
/// `host`: `<parent of local_dir>/sanitize(<host>-<remote_dir>-<name>).sync`.
pub fn state_file_path(local_dir: &Path, host: &str, remote_dir: &str) -> PathBuf {
    let local_name = local_dir
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or(Cow::Borrowed(""));
    let stem = sanitize(&format!("{host}-{remote_dir}-{local_name}"));
    let beside = match local_dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    beside.join(format!("{stem}.{STATE_FILE_EXT}"))
}

/// Root-relative path of `name` directly under `dir`.
pub fn child_path(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Root-relative path of the directory containing `path`.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Resolve a root-relative path against a local base directory.
pub fn under_root(root: &Path, path: &str) -> PathBuf {
    let rel = path.trim_start_matches('/');
    if rel.is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}
