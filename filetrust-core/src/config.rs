//! Daemon configuration
//!
//! A small TOML file; every key is optional and a missing file yields the
//! defaults, so a bare installation works without any configuration.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::trust::TrustDbError;

/// Default location of the daemon configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/filetrust/filetrust.toml";

/// Default notification pipe the CLI uses to ask the daemon to reload.
pub const DEFAULT_FIFO_PATH: &str = "/run/filetrust/filetrust.fifo";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// The trust database file
    pub trust_file: PathBuf,

    /// Mutation lock file; defaults to `<trust_file>.lock`
    pub lock_file: Option<PathBuf>,

    /// FIFO the daemon listens on for reload notifications
    pub fifo_path: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            trust_file: PathBuf::from(crate::trust::DEFAULT_DB_PATH),
            lock_file: None,
            fifo_path: PathBuf::from(DEFAULT_FIFO_PATH),
        }
    }
}

impl DaemonConfig {
    /// Load the configuration from `path`. A missing file is not an error;
    /// it yields the defaults.
    pub fn load(path: &Path) -> Result<Self, TrustDbError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no configuration at {}, using defaults", path.display());
                return Ok(DaemonConfig::default());
            }
            Err(e) => return Err(TrustDbError::io(path, e)),
        };

        toml::from_str(&text).map_err(|e| TrustDbError::Config {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Effective lock file path.
    pub fn lock_path(&self) -> PathBuf {
        match &self.lock_file {
            Some(path) => path.clone(),
            None => {
                let mut os = OsString::from(self.trust_file.as_os_str());
                os.push(".lock");
                PathBuf::from(os)
            }
        }
    }
}
