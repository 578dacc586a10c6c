//! Resident trust cache for the long-lived daemon process
//!
//! The daemon loads the database once at startup and serves lookups from
//! memory while deciding intercepted accesses. CLI mutations do not touch
//! this copy; the daemon is told to `reload` through its notification pipe
//! (an external integration point, see the CLI's notify command).

use std::path::{Path, PathBuf};

use tracing::info;

use crate::trust::codec::TrustRecord;
use crate::trust::error::TrustDbError;
use crate::trust::fingerprint::FileIdentity;
use crate::trust::list::TrustList;

#[derive(Debug)]
pub struct ResidentCache {
    db_path: PathBuf,
    list: TrustList,
}

impl ResidentCache {
    /// Load the trust database into a resident cache.
    pub fn load(db_path: &Path) -> Result<Self, TrustDbError> {
        let list = TrustList::load(db_path)?;
        info!(entries = list.len(), db = %db_path.display(), "trust cache loaded");
        Ok(ResidentCache {
            db_path: db_path.to_path_buf(),
            list,
        })
    }

    /// Exact-path lookup used per intercepted access.
    pub fn lookup(&self, path: &Path) -> Option<&TrustRecord> {
        self.list.lookup(path)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Drop the cached list and reload it from disk (after a CLI mutation
    /// signalled the daemon).
    pub fn reload(&mut self) -> Result<(), TrustDbError> {
        self.list = TrustList::load(&self.db_path)?;
        info!(entries = self.list.len(), "trust cache reloaded");
        Ok(())
    }
}

/// Whether a cached access decision must be re-validated with a full
/// content hash.
///
/// Any identity difference forces a re-hash. Identity equality only means
/// the expensive hash can be skipped for a file that was already verified;
/// it is never by itself proof of trust.
pub fn needs_rehash(cached: &FileIdentity, live: &FileIdentity) -> bool {
    cached != live
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::list::DB_HEADER;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn lookup_after_load_and_reload() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("filetrust.trust");
        fs::write(&db, format!("{DB_HEADER}/bin/ls 10 aa\n")).unwrap();

        let mut cache = ResidentCache::load(&db).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(Path::new("/bin/ls")).unwrap().hash, "aa");
        assert!(cache.lookup(Path::new("/bin/cat")).is_none());

        fs::write(&db, format!("{DB_HEADER}/bin/ls 10 aa\n/bin/cat 20 bb\n")).unwrap();
        cache.reload().unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(Path::new("/bin/cat")).is_some());
    }

    #[test]
    fn rehash_on_any_identity_change() {
        let base = FileIdentity {
            device: 1,
            inode: 2,
            mode: 0o100644,
            size: 10,
            mtime_secs: 100,
            mtime_nanos: 5,
        };
        let same = base;
        assert!(!needs_rehash(&base, &same));

        let mut touched = base;
        touched.mtime_nanos = 6;
        assert!(needs_rehash(&base, &touched));

        let mut grown = base;
        grown.size = 11;
        assert!(needs_rehash(&base, &grown));

        let mut replaced = base;
        replaced.inode = 3;
        assert!(needs_rehash(&base, &replaced));
    }
}
