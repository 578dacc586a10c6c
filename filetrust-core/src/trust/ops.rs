//! Mutation operations against the trust database file
//!
//! Each operation is a short-lived load -> mutate -> persist cycle holding
//! an exclusive lock on a sibling lock file for its whole duration, so two
//! mutator processes cannot interleave and a resident daemon reloading the
//! database never observes a half-written file.
//!
//! Append writes incrementally (bulk directory imports are the common,
//! high-volume case and should not pay an O(n) rewrite per call); delete
//! and update are rare and small, so they rewrite the whole database
//! through the atomic persist path.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use fs4::FileExt;
use tracing::{debug, warn};

use crate::trust::codec::{self, RecordPayload, TrustRecord, TrustSource};
use crate::trust::error::TrustDbError;
use crate::trust::fingerprint;
use crate::trust::list::TrustList;
use crate::trust::walker::walk_regular_files;

/// Result of a successful append: how many records were written and how
/// many candidates were skipped because they could not be fingerprinted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub added: usize,
    pub skipped: usize,
}

/// Handle to one trust database file.
pub struct TrustDb {
    db_path: PathBuf,
    lock_path: PathBuf,
}

impl TrustDb {
    /// Open a handle on the database at `db_path`. The lock file lives next
    /// to it as `<db_path>.lock`.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        let db_path = db_path.into();
        let mut lock_os = OsString::from(db_path.as_os_str());
        lock_os.push(".lock");
        TrustDb {
            db_path,
            lock_path: PathBuf::from(lock_os),
        }
    }

    /// Override the lock file location (daemon configuration).
    pub fn with_lock_path(mut self, lock_path: impl Into<PathBuf>) -> Self {
        self.lock_path = lock_path.into();
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Take the exclusive mutation lock. Released when the returned handle
    /// drops.
    fn lock(&self) -> Result<File, TrustDbError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| TrustDbError::io(&self.lock_path, e))?;
        file.lock_exclusive()
            .map_err(|e| TrustDbError::io(&self.lock_path, e))?;
        Ok(file)
    }

    /// Add `path` to the trust database.
    ///
    /// A directory expands to every regular file beneath it. Candidates
    /// already present in the database are silently dropped; an empty
    /// candidate set afterwards is `NothingToAdd`. Surviving candidates
    /// are fingerprinted one by one and appended to the end of the
    /// database file; a candidate that cannot be opened or hashed is
    /// logged and skipped, while a failed write to the database itself
    /// aborts the operation.
    pub fn append(&self, path: &Path) -> Result<AppendOutcome, TrustDbError> {
        let _lock = self.lock()?;

        let md = std::fs::metadata(path).map_err(|e| TrustDbError::io(path, e))?;
        let mut candidates = if md.is_dir() {
            walk_regular_files(path)
        } else {
            let kind = fingerprint::classify_device(md.mode());
            if kind != fingerprint::DeviceKind::Regular {
                warn!("{} is a {}, not a regular file", path.display(), kind);
            }
            vec![path.to_path_buf()]
        };

        let list = TrustList::load(&self.db_path)?;
        candidates.retain(|c| !list.contains(c));
        if candidates.is_empty() {
            return Err(TrustDbError::NothingToAdd);
        }

        let mut db = OpenOptions::new()
            .append(true)
            .open(&self.db_path)
            .map_err(|e| TrustDbError::io(&self.db_path, e))?;

        let mut added = 0;
        let mut skipped = 0;
        for candidate in &candidates {
            let line = match fingerprint_line(candidate) {
                Ok(line) => line,
                Err(e) => {
                    warn!("cannot add {}: {}", candidate.display(), e);
                    skipped += 1;
                    continue;
                }
            };
            db.write_all(line.as_bytes())
                .map_err(|e| TrustDbError::io(&self.db_path, e))?;
            added += 1;
        }

        if added == 0 {
            return Err(TrustDbError::PartialFailure { skipped });
        }

        debug!(added, skipped, db = %self.db_path.display(), "appended trust records");
        Ok(AppendOutcome { added, skipped })
    }

    /// Remove every record whose path starts with the literal prefix
    /// `path` and rewrite the database. Returns the removed count.
    pub fn delete(&self, path: &Path) -> Result<usize, TrustDbError> {
        let _lock = self.lock()?;

        let mut list = TrustList::load(&self.db_path)?;
        let removed = list.remove_matching_prefix(path);
        if removed == 0 {
            return Err(TrustDbError::NotInDatabase {
                path: path.to_path_buf(),
            });
        }

        list.persist(&self.db_path)?;
        debug!(removed, db = %self.db_path.display(), "deleted trust records");
        Ok(removed)
    }

    /// Recompute size and hash for every record whose path starts with the
    /// literal prefix `path`, then rewrite the database. Returns the
    /// updated count.
    ///
    /// Refreshed records carry the default runtime provenance tag; the
    /// previous tag is not preserved.
    pub fn update(&self, path: &Path) -> Result<usize, TrustDbError> {
        let _lock = self.lock()?;

        let mut list = TrustList::load(&self.db_path)?;
        let prefix = path.as_os_str().as_bytes();

        let mut updated = 0;
        for (entry_path, payload) in list.iter_mut() {
            if !entry_path.as_os_str().as_bytes().starts_with(prefix) {
                continue;
            }
            let record = fingerprint_record(entry_path)?;
            *payload = RecordPayload::FileTrust(record);
            updated += 1;
        }

        if updated == 0 {
            return Err(TrustDbError::NotInDatabase {
                path: path.to_path_buf(),
            });
        }

        list.persist(&self.db_path)?;
        debug!(updated, db = %self.db_path.display(), "updated trust records");
        Ok(updated)
    }
}

/// Open `path`, fingerprint it, and return its freshly computed record.
fn fingerprint_record(path: &Path) -> Result<TrustRecord, TrustDbError> {
    let mut file = File::open(path).map_err(|e| TrustDbError::io(path, e))?;
    let identity = fingerprint::identity_of(&file).map_err(|e| TrustDbError::io(path, e))?;
    let hash = fingerprint::content_hash(&mut file).map_err(|e| TrustDbError::io(path, e))?;
    Ok(TrustRecord {
        size: identity.size,
        hash,
        source: TrustSource::Runtime,
    })
}

/// Fingerprint `path` and format its database line.
fn fingerprint_line(path: &Path) -> Result<String, TrustDbError> {
    let record = fingerprint_record(path)?;
    Ok(codec::format_db_line(path, &record))
}
