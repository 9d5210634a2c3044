//! Run configuration assembled and validated from command-line arguments.

use std::path::PathBuf;

use anyhow::{bail, Result};
use upsync_core::paths::state_file_path;
use upsync_fs::Auth;

/// Where the sync lands, with everything needed to connect there.
#[derive(Debug)]
pub enum Endpoint {
    /// Another directory on this machine.
    Local { dir: PathBuf },
    Ftp {
        host: String,
        user: String,
        password: String,
        dir: String,
    },
    Sftp {
        host: String,
        user: String,
        auth: Auth,
        dir: String,
    },
}

/// A validated run configuration.
#[derive(Debug)]
pub struct Config {
    pub local_dir: PathBuf,
    pub endpoint: Endpoint,
    pub force: bool,
}

impl Config {
    /// Validate raw argument values into a runnable configuration.
    pub fn new(
        local_dir: PathBuf,
        remote: &str,
        password: Option<String>,
        identity: Option<PathBuf>,
        secure: bool,
        force: bool,
    ) -> Result<Self> {
        if !local_dir.is_dir() {
            bail!("local directory {} does not exist", local_dir.display());
        }

        let endpoint = match parse_target(remote)? {
            Target::Local { dir } => Endpoint::Local {
                dir: PathBuf::from(dir),
            },
            Target::Remote { user, host, dir } => {
                if user.is_empty() || host.is_empty() {
                    bail!("remote target must look like user@host:path, got {remote:?}");
                }
                let sftp = secure || identity.is_some();
                if sftp {
                    let auth = match (identity, password) {
                        (Some(key), _) => {
                            if !key.is_file() {
                                bail!("identity file {} does not exist", key.display());
                            }
                            Auth::Identity(key)
                        }
                        (None, Some(password)) => Auth::Password(password),
                        (None, None) => {
                            bail!("sftp needs a password (-p) or an identity file (-i)")
                        }
                    };
                    Endpoint::Sftp {
                        host,
                        user,
                        auth,
                        dir,
                    }
                } else {
                    let Some(password) = password else {
                        bail!("ftp needs a password (-p); use -s or -i for sftp");
                    };
                    Endpoint::Ftp {
                        host,
                        user,
                        password,
                        dir,
                    }
                }
            }
        };

        Ok(Self {
            local_dir,
            endpoint,
            force,
        })
    }

    /// Where this configuration persists its keep map: beside the local
    /// directory, named after host, remote directory and local name.
    pub fn state_file(&self) -> PathBuf {
        let (host, remote_dir) = match &self.endpoint {
            Endpoint::Local { dir } => ("local".to_string(), dir.to_string_lossy().into_owned()),
            Endpoint::Ftp { host, dir, .. } | Endpoint::Sftp { host, dir, .. } => {
                (host.clone(), dir.clone())
            }
        };
        state_file_path(&self.local_dir, &host, &remote_dir)
    }
}

/// A raw sync target as written on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Local {
        dir: String,
    },
    Remote {
        user: String,
        host: String,
        dir: String,
    },
}

/// Split `user@host:path` at the first `@` and the following first `:`.
/// Anything without an `@` is a local directory target. The remote path may
/// be absolute, relative to the login directory, or empty; trailing slashes
/// are dropped.
fn parse_target(raw: &str) -> Result<Target> {
    let Some((user, rest)) = raw.split_once('@') else {
        return Ok(Target::Local {
            dir: raw.to_owned(),
        });
    };
    let Some((host, dir)) = rest.split_once(':') else {
        bail!("remote target must look like user@host:path, got {raw:?}");
    };
    Ok(Target::Remote {
        user: user.to_owned(),
        host: host.to_owned(),
        dir: dir.trim_end_matches('/').to_owned(),
    })
}
