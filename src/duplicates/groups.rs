//! Duplicate groups: the presentation model built from the index buckets.
//!
//! # Overview
//!
//! The index keeps every bucket, including single-file ones. This module
//! turns buckets into [`DuplicateGroup`]s with absolute paths and decides
//! what counts as a duplicate: a group of two or more files.
//!
//! # Example
//!
//! ```
//! use dupindex::duplicates::duplicate_groups;
//! use dupindex::scanner::{ContentHash, Fingerprint};
//! use dupindex::store::{DuplicateIndex, FileRecord};
//! use std::time::UNIX_EPOCH;
//!
//! let mut index = DuplicateIndex::new("/data");
//! let fp = Fingerprint::new(1024, UNIX_EPOCH);
//! let hash = ContentHash::from_bytes([7; 32]);
//! index.add_if_unknown(FileRecord::from_relative("a.bin", fp, hash));
//! index.add_if_unknown(FileRecord::from_relative("b.bin", fp, hash));
//!
//! let groups = duplicate_groups(&index);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].wasted_space(), 1024);
//! ```

use serde::Serialize;
use std::path::PathBuf;

use crate::scanner::ContentHash;
use crate::store::DuplicateIndex;

/// Files sharing one content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Content hash shared by every file in the group
    pub hash: ContentHash,
    /// Size of each file in bytes
    pub size: u64,
    /// Absolute paths, in the order they were added to the index
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Create a new group.
    #[must_use]
    pub fn new(hash: ContentHash, size: u64, paths: Vec<PathBuf>) -> Self {
        Self { hash, size, paths }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether the group holds at least two files.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.paths.len() > 1
    }

    /// Number of redundant copies (all files minus one).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }

    /// Bytes taken by the redundant copies.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }
}

/// Every non-empty bucket of the index as a group, in ascending hash order.
#[must_use]
pub fn content_groups(index: &DuplicateIndex) -> Vec<DuplicateGroup> {
    index
        .groups_by_hash()
        .filter(|(_, paths)| !paths.is_empty())
        .map(|(hash, paths)| {
            let size = paths
                .first()
                .and_then(|p| index.record(p))
                .map_or(0, |record| record.size);
            let absolute = index
                .paths_for_hash(hash)
                .map(|paths| paths.collect::<Vec<_>>())
                .unwrap_or_default();
            DuplicateGroup::new(*hash, size, absolute)
        })
        .collect()
}

/// Groups of two or more files with identical content.
#[must_use]
pub fn duplicate_groups(index: &DuplicateIndex) -> Vec<DuplicateGroup> {
    content_groups(index)
        .into_iter()
        .filter(DuplicateGroup::is_duplicate)
        .collect()
}

/// Aggregate numbers over a set of groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupStats {
    /// Number of groups with two or more files
    pub duplicate_groups: usize,
    /// Redundant copies across all groups
    pub duplicate_files: usize,
    /// Bytes taken by the redundant copies
    pub wasted_space: u64,
}

impl GroupStats {
    /// Summarize `groups` (single-file groups are ignored).
    #[must_use]
    pub fn from_groups(groups: &[DuplicateGroup]) -> Self {
        groups
            .iter()
            .filter(|g| g.is_duplicate())
            .fold(Self::default(), |mut stats, group| {
                stats.duplicate_groups += 1;
                stats.duplicate_files += group.duplicate_count();
                stats.wasted_space += group.wasted_space();
                stats
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Fingerprint;
    use crate::store::FileRecord;
    use std::time::{Duration, UNIX_EPOCH};

    fn hash(byte: u8) -> ContentHash {
        ContentHash::from_bytes([byte; 32])
    }

    fn sample() -> DuplicateIndex {
        let mut index = DuplicateIndex::new("/data");
        let add = |index: &mut DuplicateIndex, path: &str, size: u64, byte: u8| {
            let fp = Fingerprint::new(size, UNIX_EPOCH + Duration::from_secs(1));
            index.add_if_unknown(FileRecord::from_relative(path, fp, hash(byte)));
        };
        add(&mut index, "x.txt", 100, 1);
        add(&mut index, "sub/y.txt", 100, 1);
        add(&mut index, "z.txt", 7, 2);
        add(&mut index, "w1", 50, 3);
        add(&mut index, "w2", 50, 3);
        add(&mut index, "w3", 50, 3);
        index
    }

    #[test]
    fn test_content_groups_include_singletons() {
        let groups = content_groups(&sample());
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].hash, hash(1));
        assert_eq!(
            groups[0].paths,
            vec![PathBuf::from("/data/x.txt"), PathBuf::from("/data").join("sub").join("y.txt")]
        );
        assert_eq!(groups[1].paths, vec![PathBuf::from("/data/z.txt")]);
        assert_eq!(groups[1].size, 7);
    }

    #[test]
    fn test_duplicate_groups_need_two_files() {
        let groups = duplicate_groups(&sample());
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(DuplicateGroup::is_duplicate));
    }

    #[test]
    fn test_empty_buckets_are_skipped() {
        let mut index = sample();
        index.remove("z.txt").unwrap();
        assert_eq!(content_groups(&index).len(), 2);
    }

    #[test]
    fn test_group_stats() {
        let stats = GroupStats::from_groups(&content_groups(&sample()));
        assert_eq!(stats.duplicate_groups, 2);
        assert_eq!(stats.duplicate_files, 3);
        assert_eq!(stats.wasted_space, 100 + 2 * 50);
    }

    #[test]
    fn test_group_helpers() {
        let group = DuplicateGroup::new(hash(9), 10, vec![PathBuf::from("/a")]);
        assert_eq!(group.len(), 1);
        assert!(!group.is_empty());
        assert!(!group.is_duplicate());
        assert_eq!(group.duplicate_count(), 0);
        assert_eq!(group.wasted_space(), 0);
    }
}
