//! Scanner module: everything that touches the filesystem on behalf of the index.
//!
//! This module provides functionality for:
//! - Directory traversal with shell-style pattern filtering
//! - Path identities and stat-level fingerprints
//! - Content hashing with BLAKE3
//! - Unicode path normalization
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`identity`]: Path identities, fingerprints and root-relative paths
//! - [`hasher`]: BLAKE3 content hashing (streaming or mmap)
//! - [`path_utils`]: NFC normalization and portable path strings
//!
//! # Example
//!
//! ```no_run
//! use dupindex::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     patterns: vec!["*.png".to_string()],
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}", file.path().display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod identity;
pub mod path_utils;
pub mod walker;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

pub use hasher::{content_hash_of, ContentHash, Hasher};
pub use identity::{fingerprint_of, identity_of, relative_path, Fingerprint, PathIdentity};
pub use walker::Walker;

/// Declares a 32-byte digest newtype rendered as lowercase hex.
///
/// The hex form is used for `Display`, `FromStr` and serde, which also makes
/// the type usable as a JSON object key.
macro_rules! hex_digest {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wrap raw digest bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Raw digest bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// 64-character lowercase hex representation.
            #[must_use]
            pub fn to_hex(&self) -> String {
                blake3::Hash::from_bytes(self.0).to_hex().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..12])
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::scanner::DigestParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                blake3::Hash::from_hex(s)
                    .map(|h| Self(*h.as_bytes()))
                    .map_err(|_| $crate::scanner::DigestParseError(s.to_string()))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use hex_digest;

/// A digest string that is not 64 hex characters.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid digest: '{0}'")]
pub struct DigestParseError(pub String);

/// A candidate file produced by traversal, as a `(directory, file name)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveredFile {
    /// Directory containing the file
    pub directory: PathBuf,
    /// File name within `directory`
    pub file_name: OsString,
}

impl DiscoveredFile {
    /// Create a new DiscoveredFile.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, file_name: impl Into<OsString>) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
        }
    }

    /// Split a full path into directory and file name.
    ///
    /// Returns `None` for paths without a file name (such as `/` or `..`).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?;
        let directory = path.parent().unwrap_or_else(|| Path::new(""));
        Some(Self::new(directory, file_name))
    }

    /// Full path of the file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Shell-style patterns selecting the files to analyse.
    ///
    /// A file is kept if it matches any pattern; a pattern starting with `!`
    /// excludes. An empty list keeps every file.
    pub patterns: Vec<String>,

    /// Paths that are never yielded (the persisted store file lives here).
    pub exclude_paths: Vec<PathBuf>,
}

impl WalkerConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(follow_symlinks: bool, skip_hidden: bool, patterns: Vec<String>) -> Self {
        Self {
            follow_symlinks,
            skip_hidden,
            patterns,
            exclude_paths: Vec::new(),
        }
    }

    /// Never yield `path`.
    #[must_use]
    pub fn with_excluded(mut self, path: PathBuf) -> Self {
        self.exclude_paths.push(path);
        self
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The path below the root is not valid UTF-8 and cannot be given a
    /// portable identity.
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    /// Two discovered files share one identity (same name up to Unicode
    /// normalization). The second one is skipped.
    #[error("{skipped} has the same normalized path as {kept}")]
    IdentityCollision {
        /// The file that is tracked
        kept: PathBuf,
        /// The file that is skipped
        skipped: PathBuf,
    },

    /// A pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Errors that can occur while fingerprinting or hashing a file.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Hashing stopped because shutdown was requested.
    #[error("Hashing interrupted: {0}")]
    Interrupted(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised for `path`.
    #[must_use]
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}
