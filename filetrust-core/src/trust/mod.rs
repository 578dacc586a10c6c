//! Filetrust Trust Database - persisted integrity records for trusted files
//!
//! This module maintains the on-disk list of trusted file paths, each bound
//! to a size + SHA-256 content fingerprint. The daemon loads the list once
//! at startup and consults it per intercepted access; the CLI mutates it
//! with short-lived load -> mutate -> persist cycles.
//!
//! Design principles:
//! - One mutator at a time - every mutation holds an exclusive file lock
//!   for its whole load/mutate/persist cycle
//! - No partial state on disk - full rewrites go through a temp file and
//!   an atomic rename
//! - Cheap checks first - a metadata fingerprint gates the expensive
//!   content re-hash

pub mod cache;
pub mod codec;
pub mod error;
pub mod fingerprint;
pub mod list;
pub mod ops;
pub mod walker;

pub use cache::ResidentCache;
pub use codec::{RecordPayload, TrustRecord, TrustSource};
pub use error::TrustDbError;
pub use fingerprint::{DeviceKind, FileIdentity};
pub use list::TrustList;
pub use ops::{AppendOutcome, TrustDb};

/// Default location of the trust database.
pub const DEFAULT_DB_PATH: &str = "/etc/filetrust/filetrust.trust";
