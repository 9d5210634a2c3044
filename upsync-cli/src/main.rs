//! upsync — mirror a local directory to an FTP/SFTP server.
//!
//! # Usage
//!
//! ```text
//! upsync <LOCAL_DIR> <user@host:path>  -p <password>        # FTP
//! upsync <LOCAL_DIR> <user@host:path>  -p <password> -s     # SFTP, password
//! upsync <LOCAL_DIR> <user@host:path>  -i <keyfile>         # SFTP, identity
//! upsync <LOCAL_DIR> <directory>                            # local mirror
//! ```
//!
//! State lives in a `.sync` file beside `LOCAL_DIR`; `--force` analyzes the
//! remote listing instead of the local tree.

mod config;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use colored::Colorize;

use config::{Config, Endpoint};
use progress::ConsoleProgress;
use upsync_engine::{sync, AnalysisSource, SyncOptions, SyncReport};
use upsync_fs::{FtpFileSystem, LocalFileSystem, SftpFileSystem};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "upsync",
    version,
    about = "One-way sync of a local directory to an FTP or SFTP server",
    long_about = None,
)]
struct Cli {
    /// Local directory to mirror.
    local_dir: PathBuf,

    /// Sync target: `user@host:path`, or a plain directory path for a local
    /// mirror.
    remote: String,

    /// Password for FTP or SFTP.
    #[arg(short, long)]
    password: Option<String>,

    /// Private key file for SFTP; implies -s.
    #[arg(short, long, value_name = "FILE")]
    identity: Option<PathBuf>,

    /// Use SFTP instead of FTP.
    #[arg(short, long)]
    secure: bool,

    /// Analyze the remote listing instead of the local tree: removes
    /// foreign remote files and re-uploads anything the remote lost.
    #[arg(long)]
    force: bool,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version print to stdout and succeed; anything else
            // is malformed input, which exits 1 with the usage text.
            let failed = err.use_stderr();
            let _ = err.print();
            return if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Bad argument combinations get the usage text, like malformed flags do.
    let config = match Config::new(
        cli.local_dir,
        &cli.remote,
        cli.password,
        cli.identity,
        cli.secure,
        cli.force,
    ) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            let _ = Cli::command().print_help();
            return ExitCode::FAILURE;
        }
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config) -> Result<()> {
    let opts = SyncOptions {
        local_dir: config.local_dir.clone(),
        state_file: config.state_file(),
        source: if config.force {
            AnalysisSource::Remote
        } else {
            AnalysisSource::Local
        },
    };
    log::debug!("state file: {}", opts.state_file.display());

    let mut progress = ConsoleProgress::new();
    let report = match &config.endpoint {
        Endpoint::Local { dir } => {
            let mut remote = LocalFileSystem::new(dir);
            sync(&mut remote, &opts, &mut progress)?
        }
        Endpoint::Ftp {
            host,
            user,
            password,
            dir,
        } => {
            let mut remote = FtpFileSystem::connect(host, user, password, dir)?;
            sync(&mut remote, &opts, &mut progress)?
        }
        Endpoint::Sftp {
            host,
            user,
            auth,
            dir,
        } => {
            let mut remote = SftpFileSystem::connect(host, user, auth, dir)?;
            sync(&mut remote, &opts, &mut progress)?
        }
    };

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &SyncReport) {
    if report.changes() == 0 {
        println!(
            "{} nothing to do ({} unchanged)",
            "✓".green().bold(),
            report.unchanged
        );
        return;
    }
    println!(
        "{} synced: {} copied, {} created, {} deleted, {} unchanged",
        "✓".green().bold(),
        report.copied_files,
        report.created_dirs,
        report.deleted_files + report.deleted_dirs,
        report.unchanged
    );
}
