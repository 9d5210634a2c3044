//! SFTP backend over ssh2.
//!
//! Authenticates with a password or a private-key identity, verifies the
//! server's host key against `~/.ssh/known_hosts`, and resolves every path
//! against the remote base directory.

use std::fs::File;
use std::io;
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use ssh2::{CheckResult, KnownHostFileKind, Session, Sftp};

use crate::error::{local_io, transport, FsError};
use crate::{is_nav_name, join_remote, Auth, EntryKind, FileSystem, FsEntry};

const SSH_PORT: u16 = 22;

/// Blocking SFTP session rooted at a remote base directory.
pub struct SftpFileSystem {
    session: Session,
    sftp: Sftp,
    root: String,
}

impl SftpFileSystem {
    /// Connect to `host` on port 22, verify its host key, authenticate,
    /// and open an SFTP channel.
    pub fn connect(host: &str, user: &str, auth: &Auth, root: &str) -> Result<Self, FsError> {
        let tcp = TcpStream::connect((host, SSH_PORT))
            .map_err(|e| transport(format!("could not connect to {host}: {e}"), Vec::new()))?;
        let mut session = Session::new()
            .map_err(|e| ssh_err("could not start an ssh session".to_string(), e))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| ssh_err(format!("ssh handshake with {host} failed"), e))?;
        verify_host_key(&session, host)?;
        match auth {
            Auth::Password(password) => session
                .userauth_password(user, password)
                .map_err(|e| ssh_err(format!("password authentication failed for {user}"), e))?,
            Auth::Identity(key) => session
                .userauth_pubkey_file(user, None, key, None)
                .map_err(|e| ssh_err(format!("key authentication failed for {user}"), e))?,
        }
        let sftp = session
            .sftp()
            .map_err(|e| ssh_err("could not open an sftp channel".to_string(), e))?;
        log::debug!("sftp session open: {user}@{host}, base {root:?}");
        Ok(Self {
            session,
            sftp,
            root: root.to_owned(),
        })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        PathBuf::from(join_remote(&self.root, path))
    }
}

impl FileSystem for SftpFileSystem {
    fn list(&mut self, dir: &str, kind: EntryKind) -> Result<Vec<FsEntry>, FsError> {
        let full = self.resolve(dir);
        let listed = self
            .sftp
            .readdir(&full)
            .map_err(|e| ssh_err(format!("could not list {}", full.display()), e))?;

        let mut entries = Vec::new();
        for (path, stat) in listed {
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if is_nav_name(&name) {
                continue;
            }
            let matches = match kind {
                EntryKind::File => stat.is_file(),
                EntryKind::Directory => stat.is_dir(),
            };
            if matches {
                entries.push(FsEntry { name, kind });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Create `path` like `mkdir -p`: walk the components, create what is
    /// missing, tolerate what already exists as a directory.
    fn create_directory(&mut self, path: &str) -> Result<(), FsError> {
        let full = join_remote(&self.root, path);
        for prefix in dir_chain(&full) {
            let dir = Path::new(&prefix);
            if self.sftp.stat(dir).map(|s| s.is_dir()).unwrap_or(false) {
                continue;
            }
            self.sftp
                .mkdir(dir, 0o755)
                .map_err(|e| ssh_err(format!("could not create directory {prefix}"), e))?;
        }
        Ok(())
    }

    fn delete_file(&mut self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path);
        self.sftp
            .unlink(&full)
            .map_err(|e| ssh_err(format!("could not delete file {}", full.display()), e))
    }

    fn delete_directory(&mut self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path);
        self.sftp
            .rmdir(&full)
            .map_err(|e| ssh_err(format!("could not delete directory {}", full.display()), e))
    }

    fn put_file(&mut self, source: &Path, dest: &str) -> Result<(), FsError> {
        let full = self.resolve(dest);
        let mut local = File::open(source).map_err(|e| local_io(source, e))?;
        let mut remote = self
            .sftp
            .create(&full)
            .map_err(|e| ssh_err(format!("could not create {}", full.display()), e))?;
        io::copy(&mut local, &mut remote)
            .map(|_| ())
            .map_err(|e| transport(format!("could not upload {}: {e}", full.display()), Vec::new()))
    }

    fn get_file(&mut self, source: &str, dest: &Path) -> Result<(), FsError> {
        let full = self.resolve(source);
        let mut remote = self
            .sftp
            .open(&full)
            .map_err(|e| ssh_err(format!("could not open {}", full.display()), e))?;
        let mut local = File::create(dest).map_err(|e| local_io(dest, e))?;
        io::copy(&mut remote, &mut local)
            .map(|_| ())
            .map_err(|e| transport(format!("could not download {}: {e}", full.display()), Vec::new()))
    }

    fn close(&mut self) -> Result<(), FsError> {
        self.session
            .disconnect(None, "sync finished", None)
            .map_err(|e| ssh_err("could not close the ssh session".to_string(), e))
    }
}

/// Reject hosts whose key is absent from, or conflicts with, the user's
/// `~/.ssh/known_hosts`.
fn verify_host_key(session: &Session, host: &str) -> Result<(), FsError> {
    let Some((key, _)) = session.host_key() else {
        return Err(transport(
            format!("no host key presented by {host}"),
            Vec::new(),
        ));
    };
    let mut known = session
        .known_hosts()
        .map_err(|e| ssh_err("could not read known hosts".to_string(), e))?;
    if let Some(file) = dirs::home_dir().map(|home| home.join(".ssh").join("known_hosts")) {
        if file.exists() {
            known
                .read_file(&file, KnownHostFileKind::OpenSSH)
                .map_err(|e| ssh_err(format!("could not parse {}", file.display()), e))?;
        }
    }
    match known.check_port(host, SSH_PORT, key) {
        CheckResult::Match => Ok(()),
        CheckResult::Mismatch => Err(transport(
            format!("host key mismatch for {host}"),
            Vec::new(),
        )),
        CheckResult::NotFound | CheckResult::Failure => Err(transport(
            format!("unknown host key for {host}; add it to ~/.ssh/known_hosts"),
            Vec::new(),
        )),
    }
}

fn ssh_err(message: String, err: ssh2::Error) -> FsError {
    transport(message, vec![err.message().to_owned()])
}

/// Every directory prefix of `path`, shallowest first.
fn dir_chain(path: &str) -> Vec<String> {
    let trimmed = path.trim_end_matches('/');
    let mut chain = Vec::new();
    let mut prefix = String::new();
    for part in trimmed.split('/') {
        if part.is_empty() {
            prefix.push('/');
            continue;
        }
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        prefix.push_str(part);
        chain.push(prefix.clone());
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_chain_walks_absolute_paths_from_the_top() {
        assert_eq!(dir_chain("/var/www/site"), ["/var", "/var/www", "/var/www/site"]);
    }

    #[test]
    fn dir_chain_keeps_relative_paths_relative() {
        assert_eq!(dir_chain("public_html/a"), ["public_html", "public_html/a"]);
    }

    #[test]
    fn dir_chain_of_the_server_root_is_empty() {
        assert!(dir_chain("/").is_empty());
    }

    #[test]
    fn dir_chain_ignores_a_trailing_slash() {
        assert_eq!(dir_chain("/a/b/"), ["/a", "/a/b"]);
    }
}
