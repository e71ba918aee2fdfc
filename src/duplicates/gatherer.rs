//! Scan workflow: bring the persisted index up to date with a directory.
//!
//! # Overview
//!
//! [`Gatherer::run`] drives one scan of a root directory:
//!
//! 1. Validate and canonicalize the root
//! 2. Open the store inside the root (a corrupt store, or one built for a
//!    different root, is discarded and the directory fully rescanned)
//! 3. Walk the root, streaming each file through the index so only unknown
//!    or changed files are kept as candidates
//! 4. Forget tracked files that were not discovered
//! 5. Hash the candidates in parallel on a bounded pool
//! 6. Insert the new records one at a time on the calling thread
//! 7. Record the pattern set, compact, and save if anything changed
//!
//! A shutdown request seen at any point aborts the run with
//! [`GatherError::Interrupted`] before anything is written to disk.
//!
//! # Example
//!
//! ```no_run
//! use dupindex::duplicates::{Gatherer, GathererConfig};
//! use std::path::Path;
//!
//! let config = GathererConfig::default()
//!     .with_patterns(vec!["*.jpg".to_string()])
//!     .with_io_threads(2);
//! let (index, summary) = Gatherer::new(config).run(Path::new("/photos")).unwrap();
//!
//! println!("{} files tracked, {} hashed this run", index.len(), summary.hashed);
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::progress::{ProgressCallback, PHASE_HASHING, PHASE_WALKING};
use crate::scanner::identity::{fingerprint_of, identity_of};
use crate::scanner::{
    ContentHash, DiscoveredFile, Fingerprint, HashError, Hasher, PathIdentity, ScanError, Walker,
    WalkerConfig,
};
use crate::store::{DuplicateIndex, FileRecord, StoreError, DEFAULT_STORE_FILE_NAME};

/// Configuration for a scan.
#[derive(Clone)]
pub struct GathererConfig {
    /// Number of threads hashing file content. Default is 4.
    pub io_threads: usize,
    /// Follow symbolic links while walking.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Shell-style patterns selecting the files to analyse.
    pub patterns: Vec<String>,
    /// Name of the store file inside the root.
    pub store_file_name: String,
    /// Memory-map threshold passed to the [`Hasher`].
    pub mmap_threshold: u64,
    /// Save the store at the end of the run.
    pub persist: bool,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for GathererConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GathererConfig")
            .field("io_threads", &self.io_threads)
            .field("follow_symlinks", &self.follow_symlinks)
            .field("skip_hidden", &self.skip_hidden)
            .field("patterns", &self.patterns)
            .field("store_file_name", &self.store_file_name)
            .field("mmap_threshold", &self.mmap_threshold)
            .field("persist", &self.persist)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for GathererConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            follow_symlinks: false,
            skip_hidden: false,
            patterns: Vec::new(),
            store_file_name: DEFAULT_STORE_FILE_NAME.to_string(),
            mmap_threshold: crate::scanner::hasher::DEFAULT_MMAP_THRESHOLD,
            persist: true,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl GathererConfig {
    /// Set the number of hashing threads (at least one).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Follow symbolic links while walking.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Skip hidden files and directories.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Set the file selection patterns.
    #[must_use]
    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }

    /// Set the store file name.
    #[must_use]
    pub fn with_store_file_name(mut self, name: impl Into<String>) -> Self {
        self.store_file_name = name.into();
        self
    }

    /// Set the memory-map threshold for hashing.
    #[must_use]
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }

    /// Enable or disable saving the store.
    #[must_use]
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Patterns in the form the store records them.
    fn filters(&self) -> Option<Vec<String>> {
        if self.patterns.is_empty() {
            None
        } else {
            Some(self.patterns.clone())
        }
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// What a scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatherSummary {
    /// Candidate files found by the walk
    pub files_seen: usize,
    /// Candidates skipped because their fingerprint still matched
    pub unchanged: usize,
    /// Files hashed and inserted during this run
    pub hashed: usize,
    /// Tracked files forgotten because they were not discovered
    pub removed: usize,
    /// Empty buckets dropped by compaction
    pub compacted: usize,
    /// Walk entries and files that could not be read
    pub errors: usize,
    /// The previous store was unusable and the scan started from scratch
    pub store_reset: bool,
    /// The store was written to disk
    pub persisted: bool,
    /// Wall-clock time of the run
    pub duration: Duration,
}

impl GatherSummary {
    /// Whether some files could not be read.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.errors > 0
    }
}

/// Errors that end a scan.
#[derive(thiserror::Error, Debug)]
pub enum GatherError {
    /// The scan was interrupted by the user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The walk could not start (for example, an invalid pattern).
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The store could not be read, updated or saved.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The hashing thread pool could not be created.
    #[error("Failed to create hashing thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// An I/O error occurred with a specific path.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

type HashOutcome = (DiscoveredFile, Result<(Fingerprint, ContentHash), HashError>);

/// Runs scans and keeps the store in sync with the filesystem.
pub struct Gatherer {
    config: GathererConfig,
    hasher: Arc<Hasher>,
}

impl Gatherer {
    /// Create a gatherer with the given configuration.
    #[must_use]
    pub fn new(config: GathererConfig) -> Self {
        let mut hasher = Hasher::new().with_mmap_threshold(config.mmap_threshold);
        if let Some(ref flag) = config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(flag.clone());
        }
        Self {
            config,
            hasher: Arc::new(hasher),
        }
    }

    /// Create a gatherer with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(GathererConfig::default())
    }

    /// Location of the store file for a canonical `root`.
    #[must_use]
    pub fn store_path(&self, root: &Path) -> PathBuf {
        root.join(&self.config.store_file_name)
    }

    /// Scan `root` and return the up-to-date index.
    ///
    /// # Errors
    ///
    /// - [`GatherError::PathNotFound`] / [`GatherError::NotADirectory`] for a bad root
    /// - [`GatherError::Scan`] for an invalid pattern
    /// - [`GatherError::Store`] if the store file cannot be read or saved
    /// - [`GatherError::Interrupted`] if shutdown was requested; nothing is saved
    pub fn run(&self, root: &Path) -> Result<(DuplicateIndex, GatherSummary), GatherError> {
        let start_time = Instant::now();
        let mut summary = GatherSummary::default();

        if !root.exists() {
            return Err(GatherError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(GatherError::NotADirectory(root.to_path_buf()));
        }
        let root = root.canonicalize().map_err(|source| GatherError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        log::info!("Scanning {}", root.display());
        self.check_shutdown()?;

        let store_path = self.store_path(&root);
        let mut index = self.open_store(&root, &store_path, &mut summary)?;
        let loaded_at = index.last_update();

        let walker = self.walker(&root, &store_path)?;
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_WALKING, 0);
        }

        // Walk output streams straight into the index; only files it does
        // not already know are kept.
        let mut discovery = Discovery::default();
        let candidates: Vec<DiscoveredFile> = {
            let discovered = walker.walk().filter_map(|result| {
                let file = discovery.admit(&root, result)?;
                if let Some(ref callback) = self.config.progress_callback {
                    callback.on_progress(discovery.present.len(), &file.path().to_string_lossy());
                }
                Some(file)
            });
            index.filter_unknown(discovered).collect()
        };

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_WALKING);
        }
        self.check_shutdown()?;

        summary.files_seen = discovery.present.len();
        summary.errors += discovery.errors;
        summary.unchanged = summary.files_seen - candidates.len();
        log::info!(
            "{} of {} files need hashing",
            candidates.len(),
            summary.files_seen
        );

        summary.removed = self.remove_missing(&mut index, &discovery.present)?;

        for (file, outcome) in self.hash_all(candidates)? {
            match outcome {
                Ok((fingerprint, hash)) => {
                    let record = FileRecord::new(&root, &file.path(), fingerprint, hash);
                    if index.add_if_unknown(record) {
                        summary.hashed += 1;
                    }
                }
                Err(e) => {
                    log::warn!("Skipping file: {}", e);
                    summary.errors += 1;
                }
            }
        }

        let filters = self.config.filters();
        if index.filters() != filters.as_deref() {
            index.set_filters(filters);
        }
        summary.compacted = index.compact();

        self.check_shutdown()?;

        if !self.config.persist {
            log::debug!("Persistence disabled, store not saved");
        } else if index.last_update() != loaded_at || summary.store_reset {
            index.save(&store_path)?;
            summary.persisted = true;
            log::info!("Saved store to {}", store_path.display());
        } else {
            log::debug!("Store unchanged, not saving");
        }

        summary.duration = start_time.elapsed();
        log::info!(
            "Scan complete: {} files tracked, {} hashed, {} unchanged, {} removed in {:.2?}",
            index.len(),
            summary.hashed,
            summary.unchanged,
            summary.removed,
            summary.duration
        );

        Ok((index, summary))
    }

    fn check_shutdown(&self) -> Result<(), GatherError> {
        if self.config.is_shutdown_requested() {
            log::debug!("Shutdown requested, abandoning scan");
            Err(GatherError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn open_store(
        &self,
        root: &Path,
        store_path: &Path,
        summary: &mut GatherSummary,
    ) -> Result<DuplicateIndex, GatherError> {
        match DuplicateIndex::open(root, store_path) {
            Ok(index) => Ok(index),
            Err(e @ (StoreError::Corrupt { .. } | StoreError::RootMismatch { .. })) => {
                log::warn!("{}; rebuilding the store from scratch", e);
                summary.store_reset = true;
                Ok(DuplicateIndex::new(root))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Walker for `root` that never yields the store file.
    ///
    /// Patterns are compiled here so an invalid one fails the run before
    /// anything is walked or removed.
    fn walker(&self, root: &Path, store_path: &Path) -> Result<Walker, GatherError> {
        let walker_config = WalkerConfig::new(
            self.config.follow_symlinks,
            self.config.skip_hidden,
            self.config.patterns.clone(),
        )
        .with_excluded(store_path.to_path_buf())
        .with_excluded(crate::store::persist::temp_path(store_path));

        let mut walker = Walker::new(root, walker_config);
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }
        walker.build_matcher()?;
        Ok(walker)
    }

    /// Forget every tracked file the walk did not produce.
    fn remove_missing(
        &self,
        index: &mut DuplicateIndex,
        present: &HashMap<PathIdentity, PathBuf>,
    ) -> Result<usize, GatherError> {
        let missing: Vec<String> = index
            .records()
            .filter(|record| !present.contains_key(&record.identity))
            .map(|record| record.path.clone())
            .collect();

        for path in &missing {
            index.remove(path)?;
        }
        if !missing.is_empty() {
            log::info!("Removed {} files no longer present", missing.len());
        }
        Ok(missing.len())
    }

    /// Fingerprint and hash `candidates` on a bounded pool.
    ///
    /// Results come back in candidate order; the index is not touched here.
    fn hash_all(&self, candidates: Vec<DiscoveredFile>) -> Result<Vec<HashOutcome>, GatherError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_HASHING, candidates.len());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads.max(1))
            .build()?;

        let done = AtomicUsize::new(0);
        let hasher = &self.hasher;
        let config = &self.config;
        let outcomes: Vec<HashOutcome> = pool.install(|| {
            candidates
                .into_par_iter()
                .map(|file| {
                    let path = file.path();
                    if config.is_shutdown_requested() {
                        return (file, Err(HashError::Interrupted(path)));
                    }

                    let outcome = fingerprint_of(&path).and_then(|fingerprint| {
                        let hash = hasher.content_hash(&path)?;
                        Ok((fingerprint, hash))
                    });

                    if let Some(ref callback) = config.progress_callback {
                        let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                        callback.on_progress(current, &path.to_string_lossy());
                        if let Ok((fingerprint, _)) = &outcome {
                            callback.on_item_completed(fingerprint.size);
                        }
                    }
                    if outcome.is_ok() {
                        log::trace!("Hashed {}", path.display());
                    }

                    (file, outcome)
                })
                .collect()
        });

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_HASHING);
        }

        self.check_shutdown()?;
        Ok(outcomes)
    }
}

/// Files admitted from the walk, keyed by identity.
#[derive(Default)]
struct Discovery {
    present: HashMap<PathIdentity, PathBuf>,
    errors: usize,
}

impl Discovery {
    /// Record one walk result, returning the file if it should be indexed.
    ///
    /// Walk errors, and files whose identity was already taken by an earlier
    /// file (names equal up to Unicode normalization), are logged, counted
    /// and dropped.
    fn admit(
        &mut self,
        root: &Path,
        result: Result<DiscoveredFile, ScanError>,
    ) -> Option<DiscoveredFile> {
        let error = match result {
            Ok(file) => {
                let path = file.path();
                match self.present.entry(identity_of(root, &path)) {
                    Entry::Vacant(slot) => {
                        slot.insert(path);
                        return Some(file);
                    }
                    Entry::Occupied(kept) => ScanError::IdentityCollision {
                        kept: kept.get().clone(),
                        skipped: path,
                    },
                }
            }
            Err(e) => e,
        };
        log::warn!("Walk error: {}", error);
        self.errors += 1;
        None
    }
}
