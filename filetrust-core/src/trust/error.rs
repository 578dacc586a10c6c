//! Trust database error types with clear, actionable messages

use std::path::PathBuf;
use thiserror::Error;

/// Why a single database line failed to parse.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LineParseError {
    #[error("expected `path size hash`, found fewer than three fields")]
    MissingFields,

    #[error("size field is not a valid number")]
    BadSize,

    #[error("path exceeds {} bytes", super::codec::MAX_PATH_LEN)]
    PathTooLong,

    #[error("hash exceeds {} bytes", super::codec::MAX_HASH_LEN)]
    HashTooLong,
}

/// Trust database specific errors
#[derive(Error, Debug)]
pub enum TrustDbError {
    /// The trust database file does not exist
    #[error("trust database not found at {path}\n\nCreate it (or point --db at an existing one) before adding entries.")]
    NotFound { path: PathBuf },

    /// A line in the database failed to parse; the whole load is aborted
    #[error("trust database is corrupt at line {line}: {reason}\n\nNo entries were loaded. Repair or regenerate the database before retrying.")]
    Corrupt {
        line: usize,
        #[source]
        reason: LineParseError,
    },

    /// Delete/Update matched no record
    #[error("{path} is not in the trust database")]
    NotInDatabase { path: PathBuf },

    /// Append's candidate set was empty after deduplication
    #[error("after removing duplicates, there is nothing to add")]
    NothingToAdd,

    /// Every append candidate failed to open or fingerprint
    #[error("none of the {skipped} candidate files could be fingerprinted; nothing was added")]
    PartialFailure { skipped: usize },

    /// Open/read/write/stat failure
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The digest backend could not produce an output
    #[error("content digest backend is unavailable")]
    Hash,

    /// The daemon configuration file is malformed
    #[error("cannot parse configuration file {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl TrustDbError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrustDbError::Io {
            path: path.into(),
            source,
        }
    }
}
