//! filetrust - manage the trust database of the file-access policy daemon

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use filetrust_core::config::{DaemonConfig, DEFAULT_CONFIG_PATH};
use filetrust_core::trust::{fingerprint, TrustDb, TrustList};

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "filetrust",
    about = "Trust database tool for the file-access policy daemon",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Daemon configuration file
    #[clap(long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    /// Trust database file (overrides the configuration)
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a file, or every regular file under a directory, to the trust
    /// database
    Add { path: PathBuf },

    /// Delete every record whose path starts with the given prefix
    Del { path: PathBuf },

    /// Recompute size and hash for every record whose path starts with the
    /// given prefix
    Update { path: PathBuf },

    /// Print the trust database records
    List,

    /// Re-hash every record and report modified or missing files
    Check,

    /// Tell the running daemon to reload its trust cache
    Notify,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_filter_directive())),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = DaemonConfig::load(&cli.config)?;
    debug!(?config, "configuration loaded");

    let db = match &cli.db {
        Some(path) => TrustDb::new(path),
        None => TrustDb::new(&config.trust_file).with_lock_path(config.lock_path()),
    };

    match &cli.command {
        Command::Add { path } => add(&db, path),
        Command::Del { path } => del(&db, path),
        Command::Update { path } => update(&db, path),
        Command::List => list(db.db_path()),
        Command::Check => check(db.db_path()),
        Command::Notify => notify(&config.fifo_path),
    }
}

fn add(db: &TrustDb, path: &Path) -> Result<()> {
    let outcome = db.append(path)?;
    println!("Added {} file(s) to the trust database", outcome.added);
    if outcome.skipped > 0 {
        println!("Skipped {} file(s) that could not be read", outcome.skipped);
    }
    Ok(())
}

fn del(db: &TrustDb, path: &Path) -> Result<()> {
    let removed = db.delete(path)?;
    println!("Deleted {removed} record(s) from the trust database");
    Ok(())
}

fn update(db: &TrustDb, path: &Path) -> Result<()> {
    let updated = db.update(path)?;
    println!("Updated {updated} record(s) in the trust database");
    Ok(())
}

fn list(db_path: &Path) -> Result<()> {
    let list = TrustList::load(db_path)?;
    for (path, payload) in list.iter() {
        let record = payload.as_file_trust();
        println!("{} {} {}", path.display(), record.size, record.hash);
    }
    println!("{} record(s)", list.len());
    Ok(())
}

/// Compare every record against the file currently on disk, the same way
/// the daemon would before trusting it.
fn check(db_path: &Path) -> Result<()> {
    let list = TrustList::load(db_path)?;

    let mut passed = 0;
    let mut modified = 0;
    let mut missing = 0;

    for (path, payload) in list.iter() {
        let record = payload.as_file_trust();
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(_) => {
                missing += 1;
                println!("missing   {}", path.display());
                continue;
            }
        };

        let identity = fingerprint::identity_of(&file)
            .with_context(|| format!("cannot stat {}", path.display()))?;
        let hash = fingerprint::content_hash(&mut file)
            .with_context(|| format!("cannot hash {}", path.display()))?;

        if identity.size != record.size || hash != record.hash {
            modified += 1;
            println!("modified  {}", path.display());
        } else {
            passed += 1;
        }
    }

    println!("{passed} unmodified, {modified} modified, {missing} missing");
    if modified > 0 || missing > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Write the reload token into the daemon's notification pipe.
///
/// The pipe must really be a FIFO with 0660 permissions; anything else
/// suggests it was tampered with or the daemon is not running.
fn notify(fifo_path: &Path) -> Result<()> {
    let md = fs::metadata(fifo_path)
        .with_context(|| format!("cannot stat {}", fifo_path.display()))?;

    if !md.file_type().is_fifo() {
        bail!("{} exists but is not a pipe", fifo_path.display());
    }
    let mode = md.permissions().mode() & 0o7777;
    if mode != 0o660 {
        bail!(
            "{} has mode {:03o} instead of 660",
            fifo_path.display(),
            mode
        );
    }

    let mut fifo = fs::OpenOptions::new()
        .write(true)
        .open(fifo_path)
        .with_context(|| format!("cannot open {}", fifo_path.display()))?;
    fifo.write_all(b"1\0")
        .with_context(|| format!("cannot write to {}", fifo_path.display()))?;

    println!("Daemon was notified to reload the trust database");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_mutation_commands() {
        let cli = Cli::try_parse_from(["filetrust", "add", "/bin/ls"]).unwrap();
        assert!(matches!(cli.command, Command::Add { ref path } if path == Path::new("/bin/ls")));

        let cli = Cli::try_parse_from(["filetrust", "del", "/bin"]).unwrap();
        assert!(matches!(cli.command, Command::Del { .. }));

        let cli = Cli::try_parse_from(["filetrust", "update", "/bin/ls"]).unwrap();
        assert!(matches!(cli.command, Command::Update { .. }));
    }

    #[test]
    fn parses_global_overrides() {
        let cli = Cli::try_parse_from([
            "filetrust",
            "list",
            "--db",
            "/tmp/test.trust",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/test.trust")));
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn rejects_missing_path_argument() {
        assert!(Cli::try_parse_from(["filetrust", "add"]).is_err());
    }
}
