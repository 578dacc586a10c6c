//! In-memory trust list: ordered path -> record storage
//!
//! Paths are unique within a list and insertion order is preserved so the
//! database re-serializes deterministically. Lookup volume is low (one
//! load per CLI invocation, one resident copy in the daemon), so entries
//! live in a plain vector.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::trust::codec::{self, RecordPayload, TrustRecord};
use crate::trust::error::TrustDbError;

/// Fixed human-readable header written in front of the records.
pub const DB_HEADER: &str = "\
# This file contains a list of trusted files
#
#  FULL PATH        SIZE                             SHA256
# /home/user/my-ls 157984 61a9960bf7d255a85811f4afcac51067b8f2e4c75e21cf4f2af95319d4ed1b87
";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrustList {
    entries: Vec<(PathBuf, RecordPayload)>,
}

impl TrustList {
    pub fn new() -> Self {
        TrustList::default()
    }

    /// Load the trust list from the database file.
    ///
    /// A missing file is `NotFound`; any unparsable line aborts the load
    /// with `Corrupt` and no partial list is returned.
    pub fn load(db_path: &Path) -> Result<Self, TrustDbError> {
        let file = match File::open(db_path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TrustDbError::NotFound {
                    path: db_path.to_path_buf(),
                });
            }
            Err(e) => return Err(TrustDbError::io(db_path, e)),
        };

        let mut list = TrustList::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| TrustDbError::io(db_path, e))?;
            match codec::parse_line(&line) {
                Ok(None) => continue,
                Ok(Some((path, record))) => {
                    list.entries.push((path, RecordPayload::FileTrust(record)));
                }
                Err(reason) => {
                    return Err(TrustDbError::Corrupt {
                        line: idx + 1,
                        reason,
                    });
                }
            }
        }

        debug!(entries = list.len(), db = %db_path.display(), "loaded trust database");
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|(p, _)| p == path)
    }

    /// Exact-path lookup of a file-trust record.
    pub fn lookup(&self, path: &Path) -> Option<&TrustRecord> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, payload)| payload.as_file_trust())
    }

    /// Append an entry. The caller is responsible for path uniqueness.
    pub fn append(&mut self, path: PathBuf, payload: RecordPayload) {
        self.entries.push((path, payload));
    }

    /// Remove every record whose path starts with the literal byte
    /// sequence `prefix`. Returns the number of removed records.
    ///
    /// This is not path-boundary aware: a prefix of `/usr/bin` also
    /// removes `/usr/binX`.
    pub fn remove_matching_prefix(&mut self, prefix: &Path) -> usize {
        let prefix = prefix.as_os_str().as_bytes();
        let before = self.entries.len();
        self.entries
            .retain(|(p, _)| !p.as_os_str().as_bytes().starts_with(prefix));
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &RecordPayload)> {
        self.entries.iter().map(|(p, r)| (p.as_path(), r))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Path, &mut RecordPayload)> {
        self.entries.iter_mut().map(|(p, r)| (p.as_path(), r))
    }

    /// Write the full list back to the database file: the four-line header
    /// followed by one line per record.
    ///
    /// The new contents are staged in a temp file next to the database and
    /// renamed into place so a concurrent reader never sees a half-written
    /// database.
    pub fn persist(&self, db_path: &Path) -> Result<(), TrustDbError> {
        // parent() is Some("") for a bare file name; the temp file goes in
        // the current directory in that case.
        let dir = db_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp =
            NamedTempFile::new_in(dir).map_err(|e| TrustDbError::io(db_path, e))?;

        tmp.write_all(DB_HEADER.as_bytes())
            .map_err(|e| TrustDbError::io(db_path, e))?;
        for (path, payload) in &self.entries {
            let line = codec::format_db_line(path, payload.as_file_trust());
            tmp.write_all(line.as_bytes())
                .map_err(|e| TrustDbError::io(db_path, e))?;
        }
        tmp.flush().map_err(|e| TrustDbError::io(db_path, e))?;

        // The database must stay readable by the daemon.
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o644))
            .map_err(|e| TrustDbError::io(db_path, e))?;

        tmp.persist(db_path)
            .map_err(|e| TrustDbError::io(db_path, e.error))?;

        debug!(entries = self.len(), db = %db_path.display(), "persisted trust database");
        Ok(())
    }
}
