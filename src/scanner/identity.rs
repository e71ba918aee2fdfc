//! File identity resolution.
//!
//! Derives the two cheap identifiers the index needs for every discovered
//! file, without touching file content:
//!
//! - [`PathIdentity`]: a BLAKE3 hash of the root-relative path. Stable across
//!   runs, machines and root relocations as long as the relative path string
//!   is the same.
//! - [`Fingerprint`]: `(size, modified)` from a single `stat`. A stored record
//!   whose fingerprint still matches is trusted without rehashing.

use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::path_utils::portable_path_string;
use super::HashError;

super::hex_digest! {
    /// Deterministic hash of a root-relative path.
    PathIdentity
}

/// Cheap freshness check for a file: byte length and last-modified time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    #[serde(with = "mtime_serde")]
    pub modified: SystemTime,
}

/// Serde adapter for modification times as `[unix_seconds, nanos]`.
///
/// Seconds are signed, so times before 1970 survive a round trip. Nanos are
/// always the non-negative offset from `unix_seconds`, as in
/// [`FileTime`](filetime::FileTime).
pub mod mtime_serde {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use filetime::FileTime;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize `time` as `[seconds, nanos]` relative to the Unix epoch.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        let ft = FileTime::from_system_time(*time);
        (ft.unix_seconds(), ft.nanoseconds()).serialize(serializer)
    }

    /// Deserialize a `[seconds, nanos]` pair.
    ///
    /// # Errors
    ///
    /// Fails if `nanos` is out of range or the time is not representable.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let (seconds, nanos) = <(i64, u32)>::deserialize(deserializer)?;
        from_parts(seconds, nanos)
            .ok_or_else(|| D::Error::custom(format!("invalid modification time {seconds}.{nanos:09}")))
    }

    fn from_parts(seconds: i64, nanos: u32) -> Option<SystemTime> {
        if nanos >= 1_000_000_000 {
            return None;
        }
        let whole = if seconds >= 0 {
            UNIX_EPOCH.checked_add(Duration::from_secs(seconds.unsigned_abs()))?
        } else {
            UNIX_EPOCH.checked_sub(Duration::from_secs(seconds.unsigned_abs()))?
        };
        whole.checked_add(Duration::from_nanos(u64::from(nanos)))
    }
}

impl Fingerprint {
    /// Create a fingerprint from its parts.
    #[must_use]
    pub fn new(size: u64, modified: SystemTime) -> Self {
        Self { size, modified }
    }
}

/// Express `path` relative to `root` in portable form.
///
/// Paths under `root` lose the prefix; paths that are already relative are
/// only normalized. The result uses `/` separators, NFC names, and never
/// starts with `./`.
///
/// # Example
///
/// ```
/// use dupindex::scanner::identity::relative_path;
/// use std::path::Path;
///
/// assert_eq!(relative_path(Path::new("/data"), Path::new("/data/a/b.txt")), "a/b.txt");
/// assert_eq!(relative_path(Path::new("/data"), Path::new("./a/b.txt")), "a/b.txt");
/// ```
#[must_use]
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    portable_path_string(relative)
}

/// Identity of the file at `path` under `root`.
///
/// Pure function of the portable relative path, so the same relative path
/// under two different roots yields the same identity.
#[must_use]
pub fn identity_of(root: &Path, path: &Path) -> PathIdentity {
    identity_of_relative(&relative_path(root, path))
}

/// Identity of an already-portable relative path string.
#[must_use]
pub fn identity_of_relative(relative: &str) -> PathIdentity {
    PathIdentity::from_bytes(*blake3::hash(relative.as_bytes()).as_bytes())
}

/// Read the fingerprint of a file (follows symlinks).
///
/// # Errors
///
/// Returns [`HashError`] if the file cannot be stat'ed or has no usable
/// modification time.
pub fn fingerprint_of(path: &Path) -> Result<Fingerprint, HashError> {
    let metadata = std::fs::metadata(path).map_err(|e| HashError::from_io(path, e))?;
    let modified = metadata
        .modified()
        .map_err(|e| HashError::from_io(path, e))?;
    Ok(Fingerprint::new(metadata.len(), modified))
}
