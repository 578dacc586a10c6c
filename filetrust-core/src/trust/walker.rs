//! Directory walker used by the append operation

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// Enumerate every regular file beneath `root`, in walk order.
///
/// Symlinks are not followed and are not reported as files. Unreadable
/// entries are logged and skipped rather than failing the whole walk, so
/// one bad subtree does not block a bulk import.
pub fn walk_regular_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!("skipping unreadable entry under {}: {}", root.display(), e),
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn finds_regular_files_transitively() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), b"a").unwrap();
        fs::write(dir.path().join("b"), b"b").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c"), b"c").unwrap();

        let files = walk_regular_files(dir.path());
        assert_eq!(files.len(), 3);
        assert!(files.contains(&dir.path().join("sub/c")));
    }

    #[test]
    fn skips_symlinks_and_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("real"), b"x").unwrap();
        symlink(dir.path().join("real"), dir.path().join("link")).unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        let files = walk_regular_files(dir.path());
        assert_eq!(files, vec![dir.path().join("real")]);
    }

    #[test]
    fn single_file_root_yields_itself() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("only");
        fs::write(&file, b"x").unwrap();

        assert_eq!(walk_regular_files(&file), vec![file]);
    }
}
