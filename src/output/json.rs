//! JSON report for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "hash": "abc123...",
//!       "size": 1024,
//!       "files": ["/root/a.txt", "/root/sub/b.txt"]
//!     }
//!   ],
//!   "content": null,
//!   "summary": {
//!     "root": "/root",
//!     "tracked_files": 100,
//!     "tracked_size": 1048576,
//!     "files_seen": 100,
//!     "unchanged": 97,
//!     "hashed": 3,
//!     "removed": 0,
//!     "errors": 0,
//!     "duplicate_groups": 5,
//!     "duplicate_files": 10,
//!     "reclaimable_space": 51200,
//!     "filters": ["*.txt"],
//!     "last_update": "2024-01-01T00:00:00Z",
//!     "store_reset": false,
//!     "persisted": true,
//!     "scan_duration_ms": 1234,
//!     "exit_code": 0,
//!     "exit_code_name": "DI000"
//!   }
//! }
//! ```
//!
//! `content` lists every tracked file grouped by hash when `--show-content`
//! is given, and is `null` otherwise.

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, GatherSummary, GroupStats};
use crate::error::ExitCode;
use crate::store::DuplicateIndex;

/// A group of files sharing a content hash.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// BLAKE3 hash as hexadecimal string (64 characters)
    pub hash: String,
    /// File size in bytes
    pub size: u64,
    /// Absolute paths of the files
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Convert a [`DuplicateGroup`].
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            hash: group.hash.to_hex(),
            size: group.size,
            files: group
                .paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Store and scan statistics.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Root directory of the store
    pub root: String,
    /// Number of files tracked by the store
    pub tracked_files: usize,
    /// Total recorded size of the tracked files in bytes
    pub tracked_size: u64,
    /// Candidate files found by the walk
    pub files_seen: usize,
    /// Candidates skipped because they were unchanged
    pub unchanged: usize,
    /// Files hashed during this run
    pub hashed: usize,
    /// Tracked files removed because they were no longer found
    pub removed: usize,
    /// Files or directories that could not be read
    pub errors: usize,
    /// Number of groups with two or more files
    pub duplicate_groups: usize,
    /// Total number of redundant copies
    pub duplicate_files: usize,
    /// Bytes taken by the redundant copies
    pub reclaimable_space: u64,
    /// Patterns the store was built with
    pub filters: Option<Vec<String>>,
    /// Time of the last store mutation (RFC 3339)
    pub last_update: String,
    /// Whether an unusable store was discarded
    pub store_reset: bool,
    /// Whether the store was saved
    pub persisted: bool,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DI000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Build the summary for a finished scan.
    #[must_use]
    pub fn new(
        index: &DuplicateIndex,
        summary: &GatherSummary,
        stats: GroupStats,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            root: index.root().to_string_lossy().into_owned(),
            tracked_files: index.len(),
            tracked_size: index.tracked_bytes(),
            files_seen: summary.files_seen,
            unchanged: summary.unchanged,
            hashed: summary.hashed,
            removed: summary.removed,
            errors: summary.errors,
            duplicate_groups: stats.duplicate_groups,
            duplicate_files: stats.duplicate_files,
            reclaimable_space: stats.wasted_space,
            filters: index.filters().map(<[String]>::to_vec),
            last_update: index.last_update().to_rfc3339(),
            store_reset: summary.store_reset,
            persisted: summary.persisted,
            scan_duration_ms: u64::try_from(summary.duration.as_millis()).unwrap_or(u64::MAX),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Groups of two or more identical files
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Every tracked file grouped by hash, when requested
    pub content: Option<Vec<JsonDuplicateGroup>>,
    /// Store and scan statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build a report.
    ///
    /// * `groups` - Every non-empty group of the index (singletons included)
    /// * `show_content` - Include the full content listing
    #[must_use]
    pub fn new(
        index: &DuplicateIndex,
        groups: &[DuplicateGroup],
        summary: &GatherSummary,
        show_content: bool,
        exit_code: ExitCode,
    ) -> Self {
        let duplicates = groups
            .iter()
            .filter(|g| g.is_duplicate())
            .map(JsonDuplicateGroup::from_duplicate_group)
            .collect();
        let content = show_content.then(|| {
            groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect()
        });

        Self {
            duplicates,
            content,
            summary: JsonSummary::new(index, summary, GroupStats::from_groups(groups), exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON output: {0}")]
    Io(#[from] std::io::Error),
}
