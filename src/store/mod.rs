//! Persistent duplicate-tracking store.
//!
//! This module holds the state of the system: which files are known, what
//! they looked like when last hashed, and which of them share content.
//!
//! # Architecture
//!
//! * [`record`]: The [`FileRecord`] value type, one per tracked file.
//! * [`index`]: [`DuplicateIndex`], the dual-keyed store and its invariants.
//! * [`persist`]: Loading and saving the index as a gzip-compressed JSON
//!   envelope inside the scanned directory.
//!
//! # Invalidation
//!
//! A record is trusted as long as the file's size and modification time are
//! unchanged. Anything else (new path, different size, different mtime)
//! sends the file back through content hashing.

pub mod index;
pub mod persist;
pub mod record;

use std::path::PathBuf;

pub use index::DuplicateIndex;
pub use persist::{DEFAULT_STORE_FILE_NAME, STORE_VERSION};
pub use record::FileRecord;

/// Errors raised by the store and its persistence layer.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The path is not tracked by the store.
    #[error("Not tracked by the store: {0}")]
    NotFound(String),

    /// The in-memory indices disagree with each other.
    #[error("Store indices are inconsistent: {0}")]
    Inconsistent(String),

    /// The persisted store could not be decoded or failed verification.
    #[error("Corrupt store file {path}: {reason}")]
    Corrupt {
        /// Store file
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// The persisted store was built for a different root directory.
    #[error("Store was built for {recorded}, not {current}")]
    RootMismatch {
        /// Root recorded in the store file
        recorded: PathBuf,
        /// Root being scanned now
        current: PathBuf,
    },

    /// An I/O error occurred while reading or writing the store file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Store file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
