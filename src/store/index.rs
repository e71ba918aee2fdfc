//! The duplicate index: every known file, keyed by path identity and by content hash.
//!
//! # Overview
//!
//! [`DuplicateIndex`] owns two indices that must always agree:
//!
//! - identity → [`FileRecord`] (exactly one entry per tracked file), mirrored
//!   by a set of known identities for cheap membership tests
//! - content hash → ordered list of root-relative paths (a *bucket*)
//!
//! Every tracked path sits in exactly one bucket: the one keyed by its
//! record's content hash. Removals may leave a bucket empty until
//! [`DuplicateIndex::compact`] runs.
//!
//! The fingerprint gate, [`DuplicateIndex::is_known`], is what makes repeated
//! scans cheap: a file whose `(size, modified)` still matches its record is
//! never rehashed.
//!
//! Every mutation advances [`DuplicateIndex::last_update`] as its final step,
//! and either fully applies or fails before touching either index.
//!
//! # Example
//!
//! ```
//! use dupindex::scanner::{ContentHash, Fingerprint};
//! use dupindex::store::{DuplicateIndex, FileRecord};
//! use std::time::{Duration, UNIX_EPOCH};
//!
//! let mut index = DuplicateIndex::new("/data");
//! let fp = Fingerprint::new(10, UNIX_EPOCH + Duration::from_secs(100));
//! let h1 = ContentHash::from_bytes([1; 32]);
//!
//! index.add_if_unknown(FileRecord::from_relative("x.txt", fp, h1));
//! index.add_if_unknown(FileRecord::from_relative("y.txt", fp, h1));
//!
//! let duplicates: Vec<_> = index.groups_by_hash().filter(|(_, paths)| paths.len() > 1).collect();
//! assert_eq!(duplicates.len(), 1);
//! ```

use std::collections::{btree_map, BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{FileRecord, StoreError};
use crate::scanner::identity::{fingerprint_of, identity_of};
use crate::scanner::{relative_path, ContentHash, DiscoveredFile, Fingerprint, PathIdentity};

/// Persistent duplicate-tracking store for one root directory.
///
/// Ordered maps keep serialization deterministic and make
/// [`groups_by_hash`](Self::groups_by_hash) iterate in ascending hash order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateIndex {
    /// Absolute root the relative paths resolve against. Not persisted.
    #[serde(skip)]
    root: PathBuf,
    #[serde(rename = "known_identities")]
    known: BTreeSet<PathIdentity>,
    #[serde(rename = "identity_to_record")]
    records: BTreeMap<PathIdentity, FileRecord>,
    #[serde(rename = "hash_to_paths")]
    buckets: BTreeMap<ContentHash, Vec<String>>,
    #[serde(rename = "updated")]
    last_update: DateTime<Utc>,
    filters: Option<Vec<String>>,
}

impl DuplicateIndex {
    /// Create an empty index for `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            known: BTreeSet::new(),
            records: BTreeMap::new(),
            buckets: BTreeMap::new(),
            last_update: DateTime::<Utc>::UNIX_EPOCH,
            filters: None,
        }
    }

    /// Root directory the relative paths resolve against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn set_root(&mut self, root: PathBuf) {
        self.root = root;
    }

    /// Number of tracked files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Whether no file is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Time of the most recent mutation (the Unix epoch for a fresh index).
    #[must_use]
    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// Patterns used for the scan that produced the current contents.
    #[must_use]
    pub fn filters(&self) -> Option<&[String]> {
        self.filters.as_deref()
    }

    /// Record the patterns used for the current scan.
    pub fn set_filters(&mut self, filters: Option<Vec<String>>) {
        log::debug!("Store filters set to {:?}", filters);
        self.filters = filters;
        self.touch();
    }

    /// Whether `identity` is tracked with exactly this fingerprint.
    ///
    /// A new identity, or a size or modification-time mismatch, means the
    /// file's content has to be hashed.
    #[must_use]
    pub fn is_known(&self, identity: &PathIdentity, fingerprint: &Fingerprint) -> bool {
        if !self.known.contains(identity) {
            return false;
        }
        self.records
            .get(identity)
            .is_some_and(|stored| stored.size == fingerprint.size && stored.modified == fingerprint.modified)
    }

    /// Insert `record` unless an identical fingerprint is already tracked.
    ///
    /// Returns `true` if the record was inserted. When the identity is
    /// tracked with a stale fingerprint, the old record is replaced and its
    /// path leaves the old bucket.
    pub fn add_if_unknown(&mut self, record: FileRecord) -> bool {
        if self.is_known(&record.identity, &record.fingerprint()) {
            log::trace!("Unchanged, not re-adding: {}", record.path);
            return false;
        }

        if let Some(previous) = self.records.get(&record.identity) {
            let (old_hash, old_path) = (previous.content_hash, previous.path.clone());
            self.detach_from_bucket(&old_hash, &old_path);
            log::debug!("Replacing stale record for {}", old_path);
        } else {
            log::debug!("Adding {} to the store", record.path);
        }

        self.buckets
            .entry(record.content_hash)
            .or_default()
            .push(record.path.clone());
        self.known.insert(record.identity);
        self.records.insert(record.identity, record);
        self.touch();
        true
    }

    /// Stop tracking `path` (root-relative, or absolute under the root).
    ///
    /// The path's bucket is left in place even if it becomes empty; see
    /// [`compact`](Self::compact).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the path is not tracked, in which
    /// case nothing is modified.
    pub fn remove(&mut self, path: impl AsRef<Path>) -> Result<FileRecord, StoreError> {
        let path = path.as_ref();
        let identity = identity_of(&self.root, path);

        let entry = match self.records.entry(identity) {
            btree_map::Entry::Occupied(entry) if self.known.contains(&identity) => entry,
            _ => return Err(StoreError::NotFound(relative_path(&self.root, path))),
        };

        let record = entry.get();
        let (bucket, position) = self
            .buckets
            .get_mut(&record.content_hash)
            .and_then(|bucket| {
                let position = bucket.iter().position(|p| *p == record.path)?;
                Some((bucket, position))
            })
            .ok_or_else(|| {
                StoreError::Inconsistent(format!(
                    "{} is missing from bucket {}",
                    record.path, record.content_hash
                ))
            })?;

        bucket.remove(position);
        self.known.remove(&identity);
        let removed = entry.remove();
        log::debug!("Removed {} from the store", removed.path);
        self.touch();
        Ok(removed)
    }

    /// Lazily keep only the discovered files that need a content hash.
    ///
    /// Each candidate is fingerprinted when the iterator reaches it, never
    /// earlier. Candidates whose fingerprint cannot be read are logged and
    /// dropped: they are never presented to the index.
    pub fn filter_unknown<'a, I>(
        &'a self,
        discovered: I,
    ) -> impl Iterator<Item = DiscoveredFile> + 'a
    where
        I: IntoIterator<Item = DiscoveredFile>,
        I::IntoIter: 'a,
    {
        discovered.into_iter().filter(move |file| {
            let path = file.path();
            let fingerprint = match fingerprint_of(&path) {
                Ok(fp) => fp,
                Err(e) => {
                    log::warn!("Skipping unreadable file: {}", e);
                    return false;
                }
            };
            let known = self.is_known(&identity_of(&self.root, &path), &fingerprint);
            if known {
                log::trace!("Unchanged: {}", path.display());
            }
            !known
        })
    }

    /// Every bucket as `(content hash, relative paths)`, in ascending hash order.
    ///
    /// Single-path buckets are included; callers decide what counts as a
    /// duplicate.
    pub fn groups_by_hash(&self) -> impl Iterator<Item = (&ContentHash, &[String])> + '_ {
        self.buckets
            .iter()
            .map(|(hash, paths)| (hash, paths.as_slice()))
    }

    /// Absolute paths of the files with content hash `hash`.
    ///
    /// Returns `None` if the hash has no bucket.
    pub fn paths_for_hash(
        &self,
        hash: &ContentHash,
    ) -> Option<impl Iterator<Item = PathBuf> + '_> {
        self.buckets
            .get(hash)
            .map(|paths| paths.iter().map(|p| self.absolute_path(p)))
    }

    /// Resolve a stored relative path against the root.
    #[must_use]
    pub fn absolute_path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|c| !c.is_empty())
            .fold(self.root.clone(), |acc, component| acc.join(component))
    }

    /// Drop buckets left empty by removals. Returns how many were dropped.
    pub fn compact(&mut self) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, paths| !paths.is_empty());
        let dropped = before - self.buckets.len();
        if dropped > 0 {
            log::debug!("Compacted {} empty bucket(s)", dropped);
            self.touch();
        }
        dropped
    }

    /// Whether `path` (relative, or absolute under the root) is tracked.
    #[must_use]
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.known.contains(&identity_of(&self.root, path.as_ref()))
    }

    /// The record tracked for `path`, if any.
    #[must_use]
    pub fn record(&self, path: impl AsRef<Path>) -> Option<&FileRecord> {
        self.records.get(&identity_of(&self.root, path.as_ref()))
    }

    /// All tracked records, in identity order.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> + '_ {
        self.records.values()
    }

    /// Relative paths of every tracked file.
    pub fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.values().map(|r| r.path.as_str())
    }

    /// Sum of the recorded sizes of every tracked file.
    #[must_use]
    pub fn tracked_bytes(&self) -> u64 {
        self.records.values().map(|r| r.size).sum()
    }

    /// Verify that the two indices agree.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Inconsistent`] describing the first violation.
    pub fn check_invariants(&self) -> Result<(), StoreError> {
        if self.known.len() != self.records.len()
            || self.known.iter().any(|id| !self.records.contains_key(id))
        {
            return Err(StoreError::Inconsistent(
                "known identities differ from record keys".to_string(),
            ));
        }

        let mut placements: BTreeMap<&str, &ContentHash> = BTreeMap::new();
        for (hash, paths) in &self.buckets {
            for path in paths {
                if placements.insert(path.as_str(), hash).is_some() {
                    return Err(StoreError::Inconsistent(format!(
                        "{path} appears in more than one bucket slot"
                    )));
                }
            }
        }

        if placements.len() != self.records.len() {
            return Err(StoreError::Inconsistent(format!(
                "{} bucket entries for {} records",
                placements.len(),
                self.records.len()
            )));
        }

        for (identity, record) in &self.records {
            if record.identity != *identity {
                return Err(StoreError::Inconsistent(format!(
                    "record for {} stored under a foreign identity",
                    record.path
                )));
            }
            match placements.get(record.path.as_str()) {
                Some(hash) if **hash == record.content_hash => {}
                Some(hash) => {
                    return Err(StoreError::Inconsistent(format!(
                        "{} is in bucket {} but hashes to {}",
                        record.path, hash, record.content_hash
                    )))
                }
                None => {
                    return Err(StoreError::Inconsistent(format!(
                        "{} is in no bucket",
                        record.path
                    )))
                }
            }
        }

        Ok(())
    }

    fn detach_from_bucket(&mut self, hash: &ContentHash, path: &str) {
        if let Some(bucket) = self.buckets.get_mut(hash) {
            bucket.retain(|p| p != path);
        }
    }

    /// Advance `last_update`, strictly.
    fn touch(&mut self) {
        let now = Utc::now();
        self.last_update = if now > self.last_update {
            now
        } else {
            self.last_update + Duration::microseconds(1)
        };
    }
}
