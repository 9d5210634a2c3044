//! FTP backend over suppaftp.
//!
//! One blocking control connection per run. The session logs in, switches
//! to binary transfers, and resolves every path against the remote base
//! directory. Server reply lines are carried into transport errors so a
//! failed run shows what the server actually said.

use std::fs::File;
use std::io;
use std::path::Path;

use suppaftp::list;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};

use crate::error::{local_io, transport, FsError};
use crate::{is_nav_name, join_remote, EntryKind, FileSystem, FsEntry};

const FTP_PORT: u16 = 21;

/// Blocking FTP session rooted at a remote base directory.
pub struct FtpFileSystem {
    stream: FtpStream,
    root: String,
}

impl FtpFileSystem {
    /// Connect to `host` on port 21, log in, and switch to binary mode.
    pub fn connect(host: &str, user: &str, password: &str, root: &str) -> Result<Self, FsError> {
        let mut stream = FtpStream::connect((host, FTP_PORT))
            .map_err(|e| ftp_err(format!("could not connect to {host}"), e))?;
        stream
            .login(user, password)
            .map_err(|e| ftp_err(format!("could not log in as {user}"), e))?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| ftp_err("could not enable binary transfers".to_string(), e))?;
        log::debug!("ftp session open: {user}@{host}, base {root:?}");
        Ok(Self {
            stream,
            root: root.to_owned(),
        })
    }

    fn resolve(&self, path: &str) -> String {
        join_remote(&self.root, path)
    }
}

impl FileSystem for FtpFileSystem {
    fn list(&mut self, dir: &str, kind: EntryKind) -> Result<Vec<FsEntry>, FsError> {
        let full = self.resolve(dir);
        let lines = self
            .stream
            .list(Some(full.as_str()))
            .map_err(|e| ftp_err(format!("could not list {full}"), e))?;

        let mut entries = Vec::new();
        for line in lines {
            // Servers also emit totals and blank lines; skip whatever the
            // parser cannot read.
            let Ok(parsed) = list::File::try_from(line.as_str()) else {
                log::debug!("skipping unparsed LIST line: {line:?}");
                continue;
            };
            if is_nav_name(parsed.name()) {
                continue;
            }
            let matches = match kind {
                EntryKind::File => parsed.is_file(),
                EntryKind::Directory => parsed.is_directory(),
            };
            if matches {
                entries.push(FsEntry {
                    name: parsed.name().to_owned(),
                    kind,
                });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Single `MKD`. Fails if the directory exists, which phase one of a
    /// run tolerates for the sync root and nothing else does.
    fn create_directory(&mut self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path);
        self.stream
            .mkdir(&full)
            .map_err(|e| ftp_err(format!("could not create directory {full}"), e))
    }

    fn delete_file(&mut self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path);
        self.stream
            .rm(&full)
            .map_err(|e| ftp_err(format!("could not delete file {full}"), e))
    }

    fn delete_directory(&mut self, path: &str) -> Result<(), FsError> {
        let full = self.resolve(path);
        self.stream
            .rmdir(&full)
            .map_err(|e| ftp_err(format!("could not delete directory {full}"), e))
    }

    fn put_file(&mut self, source: &Path, dest: &str) -> Result<(), FsError> {
        let full = self.resolve(dest);
        let mut local = File::open(source).map_err(|e| local_io(source, e))?;
        self.stream
            .put_file(&full, &mut local)
            .map(|_| ())
            .map_err(|e| ftp_err(format!("could not upload {full}"), e))
    }

    fn get_file(&mut self, source: &str, dest: &Path) -> Result<(), FsError> {
        let full = self.resolve(source);
        let mut local = File::create(dest).map_err(|e| local_io(dest, e))?;
        self.stream
            .retr(&full, |remote| {
                io::copy(remote, &mut local).map_err(FtpError::ConnectionError)?;
                Ok(())
            })
            .map_err(|e| ftp_err(format!("could not download {full}"), e))
    }

    fn close(&mut self) -> Result<(), FsError> {
        self.stream
            .quit()
            .map_err(|e| ftp_err("could not close the ftp session".to_string(), e))
    }
}

/// Wrap a suppaftp error. A server reply becomes a reply line; everything
/// else folds its cause into the message.
fn ftp_err(message: String, err: FtpError) -> FsError {
    match err {
        FtpError::UnexpectedResponse(response) => transport(message, vec![response.to_string()]),
        other => transport(format!("{message}: {other}"), Vec::new()),
    }
}
