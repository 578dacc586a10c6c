//! File fingerprints: cheap metadata identity and SHA-256 content digests
//!
//! The identity fingerprint costs one fstat and is used by the access
//! decision engine to tell whether a previously checked file may have
//! changed. The content digest reads the whole file and is only computed
//! when a record is added or refreshed.

use std::fs::File;
use std::io::{self, Read};
use std::os::unix::fs::MetadataExt;

use sha2::{Digest, Sha256};

/// Metadata fingerprint identifying one version of one file.
///
/// Never persisted; computed fresh per open file. Two identities are equal
/// only if every field matches exactly, and even then equality is a
/// necessary-but-not-sufficient condition for trust - it only tells the
/// caller whether a content re-hash can be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    pub device: u64,
    pub inode: u64,
    pub mode: u32,
    pub size: u64,
    pub mtime_secs: i64,
    pub mtime_nanos: i64,
}

/// Coarse file kind derived from the mode bitmask, used for annotation and
/// logging only, never for trust decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Character,
    Block,
    Regular,
    Directory,
    Symlink,
    Fifo,
    Socket,
    Other,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeviceKind::Character => "character device",
            DeviceKind::Block => "block device",
            DeviceKind::Regular => "regular file",
            DeviceKind::Directory => "directory",
            DeviceKind::Symlink => "symlink",
            DeviceKind::Fifo => "fifo",
            DeviceKind::Socket => "socket",
            DeviceKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Compute the identity fingerprint of an open file.
///
/// A zero mtime component means the file was never modified; the creation
/// time stands in for it so that identity still changes when the inode is
/// replaced.
pub fn identity_of(file: &File) -> io::Result<FileIdentity> {
    let md = file.metadata()?;

    let mtime_secs = if md.mtime() != 0 { md.mtime() } else { md.ctime() };
    let mtime_nanos = if md.mtime_nsec() != 0 {
        md.mtime_nsec()
    } else {
        md.ctime_nsec()
    };

    Ok(FileIdentity {
        device: md.dev(),
        inode: md.ino(),
        mode: md.mode(),
        size: md.size(),
        mtime_secs,
        mtime_nanos,
    })
}

/// Hash the file's contents from the current offset with SHA-256 and return
/// the digest as a lowercase hex string.
pub fn content_hash(file: &mut File) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Map an `st_mode` bitmask to a coarse file kind.
pub fn classify_device(mode: u32) -> DeviceKind {
    match mode & libc::S_IFMT {
        libc::S_IFCHR => DeviceKind::Character,
        libc::S_IFBLK => DeviceKind::Block,
        libc::S_IFREG => DeviceKind::Regular,
        libc::S_IFDIR => DeviceKind::Directory,
        libc::S_IFLNK => DeviceKind::Symlink,
        libc::S_IFIFO => DeviceKind::Fifo,
        libc::S_IFSOCK => DeviceKind::Socket,
        _ => DeviceKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn content_hash_known_digest() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"hello world").unwrap();

        let mut f = File::open(tmp.path()).unwrap();
        let hash = content_hash(&mut f).unwrap();
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn content_hash_reads_from_current_offset() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"xxhello world").unwrap();

        let mut f = File::open(tmp.path()).unwrap();
        f.seek(SeekFrom::Start(2)).unwrap();
        let hash = content_hash(&mut f).unwrap();
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn identity_is_stable_for_unchanged_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"stable").unwrap();

        let f = File::open(tmp.path()).unwrap();
        let a = identity_of(&f).unwrap();
        let b = identity_of(&f).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.size, 6);
        assert_eq!(classify_device(a.mode), DeviceKind::Regular);
    }

    #[test]
    fn identity_differs_after_size_change() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"one").unwrap();
        let f = File::open(tmp.path()).unwrap();
        let before = identity_of(&f).unwrap();

        tmp.write_all(b" two").unwrap();
        tmp.flush().unwrap();
        let after = identity_of(&File::open(tmp.path()).unwrap()).unwrap();

        assert_ne!(before, after);
        assert_ne!(before.size, after.size);
    }

    #[test]
    fn classify_device_kinds() {
        assert_eq!(classify_device(libc::S_IFDIR | 0o755), DeviceKind::Directory);
        assert_eq!(classify_device(libc::S_IFCHR | 0o620), DeviceKind::Character);
        assert_eq!(classify_device(libc::S_IFBLK | 0o660), DeviceKind::Block);
        assert_eq!(classify_device(libc::S_IFLNK | 0o777), DeviceKind::Symlink);
        assert_eq!(classify_device(libc::S_IFIFO | 0o660), DeviceKind::Fifo);
        assert_eq!(classify_device(libc::S_IFSOCK | 0o755), DeviceKind::Socket);
        assert_eq!(classify_device(0), DeviceKind::Other);
    }
}
