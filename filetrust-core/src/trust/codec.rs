//! Record codec for the line-oriented trust database
//!
//! One record per line, three whitespace-separated fields:
//!
//! ```text
//! /absolute/path/to/file <size_in_bytes> <64-hex-char-sha256>
//! ```
//!
//! Lines starting with `#` or a control character are comments. The
//! internal (cross-backend) serialization carries a numeric provenance tag
//! in front of size and hash; the on-disk form omits it, so every record
//! reloads as [`TrustSource::StaticDatabase`].

use std::path::{Path, PathBuf};

use crate::trust::error::LineParseError;

/// Upper bound on the path field, in bytes.
pub const MAX_PATH_LEN: usize = 4096;

/// Upper bound on the hash field, in bytes (64 hex chars for SHA-256).
pub const MAX_HASH_LEN: usize = 64;

/// Where a trust record came from.
///
/// Only the wire tags are meaningful to other backends; the file backend
/// itself does not change behavior based on provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustSource {
    /// Added at runtime (or refreshed by an update)
    Runtime,
    /// Loaded from the static trust database
    StaticDatabase,
}

impl TrustSource {
    /// Numeric tag used by the internal serialization.
    pub fn tag(self) -> u32 {
        match self {
            TrustSource::Runtime => 0,
            TrustSource::StaticDatabase => 1,
        }
    }
}

/// One entry in the trust database, keyed externally by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustRecord {
    /// Expected content length in bytes
    pub size: u64,
    /// Lowercase hex SHA-256 of the content
    pub hash: String,
    /// Provenance; not written to the database file
    pub source: TrustSource,
}

/// Payload of a trust list entry, one variant per backend kind.
///
/// Only the file-trust backend is implemented here; package-manager
/// backends would add their own variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPayload {
    FileTrust(TrustRecord),
}

impl RecordPayload {
    pub fn as_file_trust(&self) -> &TrustRecord {
        match self {
            RecordPayload::FileTrust(rec) => rec,
        }
    }
}

/// Parse one database line.
///
/// Comment and blank lines yield `Ok(None)`. A data line must carry at
/// least three fields; anything past the third field is ignored. Fewer
/// fields, an unparsable size, or an over-long path or hash make the whole
/// database unusable, so the caller must abort the load.
pub fn parse_line(line: &str) -> Result<Option<(PathBuf, TrustRecord)>, LineParseError> {
    let first = match line.bytes().next() {
        None => return Ok(None),
        Some(b) => b,
    };
    if first.is_ascii_control() || first == b'#' {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();
    let path = fields.next().ok_or(LineParseError::MissingFields)?;
    let size = fields.next().ok_or(LineParseError::MissingFields)?;
    let hash = fields.next().ok_or(LineParseError::MissingFields)?;

    if path.len() > MAX_PATH_LEN {
        return Err(LineParseError::PathTooLong);
    }
    if hash.len() > MAX_HASH_LEN {
        return Err(LineParseError::HashTooLong);
    }
    let size: u64 = size.parse().map_err(|_| LineParseError::BadSize)?;

    Ok(Some((
        PathBuf::from(path),
        TrustRecord {
            size,
            hash: hash.to_string(),
            source: TrustSource::StaticDatabase,
        },
    )))
}

/// Serialize a record into its on-disk database line.
pub fn format_db_line(path: &Path, record: &TrustRecord) -> String {
    format!("{} {} {}\n", path.display(), record.size, record.hash)
}

/// Serialize a record into the provenance-tagged internal form shared with
/// other backends.
pub fn format_internal(record: &TrustRecord) -> String {
    format!("{} {} {}", record.source.tag(), record.size, record.hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(size: u64, hash: &str) -> TrustRecord {
        TrustRecord {
            size,
            hash: hash.to_string(),
            source: TrustSource::StaticDatabase,
        }
    }

    #[test]
    fn parses_valid_line() {
        let parsed = parse_line("/bin/ls 142144 0a28b2").unwrap();
        let (path, rec) = parsed.unwrap();
        assert_eq!(path, PathBuf::from("/bin/ls"));
        assert_eq!(rec.size, 142144);
        assert_eq!(rec.hash, "0a28b2");
        assert_eq!(rec.source, TrustSource::StaticDatabase);
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        assert_eq!(parse_line("# header").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("\tindented").unwrap(), None);
    }

    #[test]
    fn rejects_short_line() {
        assert_eq!(
            parse_line("/bin/ls 142144").unwrap_err(),
            LineParseError::MissingFields
        );
    }

    #[test]
    fn rejects_bad_size() {
        assert_eq!(
            parse_line("/bin/ls big 0a28b2").unwrap_err(),
            LineParseError::BadSize
        );
    }

    #[test]
    fn ignores_extra_fields() {
        let (path, rec) = parse_line("/bin/ls 10 abcd trailing junk")
            .unwrap()
            .unwrap();
        assert_eq!(path, PathBuf::from("/bin/ls"));
        assert_eq!(rec.size, 10);
        assert_eq!(rec.hash, "abcd");
    }

    #[test]
    fn rejects_overlong_fields() {
        let long_path = format!("/{} 10 abcd", "x".repeat(MAX_PATH_LEN + 1));
        assert_eq!(
            parse_line(&long_path).unwrap_err(),
            LineParseError::PathTooLong
        );

        let long_hash = format!("/bin/ls 10 {}", "a".repeat(MAX_HASH_LEN + 1));
        assert_eq!(
            parse_line(&long_hash).unwrap_err(),
            LineParseError::HashTooLong
        );
    }

    #[test]
    fn db_line_round_trips() {
        let rec = record(
            157984,
            "61a9960bf7d255a85811f4afcac51067b8f2e4c75e21cf4f2af95319d4ed1b87",
        );
        let line = format_db_line(Path::new("/home/user/my-ls"), &rec);
        assert_eq!(
            line,
            "/home/user/my-ls 157984 61a9960bf7d255a85811f4afcac51067b8f2e4c75e21cf4f2af95319d4ed1b87\n"
        );

        let (path, reparsed) = parse_line(line.trim_end()).unwrap().unwrap();
        assert_eq!(path, PathBuf::from("/home/user/my-ls"));
        assert_eq!(reparsed, rec);
    }

    #[test]
    fn internal_form_carries_source_tag() {
        let mut rec = record(10, "abcd");
        assert_eq!(format_internal(&rec), "1 10 abcd");

        rec.source = TrustSource::Runtime;
        assert_eq!(format_internal(&rec), "0 10 abcd");
    }
}
