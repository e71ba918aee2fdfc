//! Tracked file record.

use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::scanner::identity::{identity_of_relative, relative_path};
use crate::scanner::{ContentHash, Fingerprint, PathIdentity};

/// One tracked file, as last observed.
///
/// `path` is root-relative in portable form (see
/// [`relative_path`](crate::scanner::relative_path)), so a store
/// full of records stays meaningful when the root is copied elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Root-relative path
    pub path: String,
    /// Hash of `path`
    pub identity: PathIdentity,
    /// Byte length at last observation
    pub size: u64,
    /// Last-modification time at last observation
    #[serde(with = "crate::scanner::identity::mtime_serde")]
    pub modified: SystemTime,
    /// Hash of the file bytes
    pub content_hash: ContentHash,
}

impl FileRecord {
    /// Build a record for `path` (absolute under `root`, or already relative).
    #[must_use]
    pub fn new(
        root: &Path,
        path: &Path,
        fingerprint: Fingerprint,
        content_hash: ContentHash,
    ) -> Self {
        Self::from_relative(relative_path(root, path), fingerprint, content_hash)
    }

    /// Build a record from a portable relative path string.
    #[must_use]
    pub fn from_relative(
        relative: impl Into<String>,
        fingerprint: Fingerprint,
        content_hash: ContentHash,
    ) -> Self {
        let path = relative.into();
        Self {
            identity: identity_of_relative(&path),
            path,
            size: fingerprint.size,
            modified: fingerprint.modified,
            content_hash,
        }
    }

    /// The `(size, modified)` pair this record was observed with.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.size, self.modified)
    }
}
