//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! [`Walker`] is the traversal collaborator of the index: it enumerates the
//! candidate files under a root and hands them out as
//! [`DiscoveredFile`] pairs. It never stats file content and never hashes;
//! deciding which candidates need work is the index's job.
//!
//! # Features
//!
//! - Parallel directory reading via jwalk, children sorted for deterministic output
//! - Shell-style include patterns (`*.png`) and `!`-prefixed excludes, matched
//!   through the `ignore` crate's override globs
//! - Optional symlink following and hidden-file skipping
//! - Explicit exclusion list (used to hide the persisted store file)
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use dupindex::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig::new(false, true, vec!["*.jpg".into(), "*.png".into()]);
//! let walker = Walker::new(Path::new("/home/user/Pictures"), config);
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} candidate files", files.len());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::overrides::{Override, OverrideBuilder};
use jwalk::WalkDir;

use super::{DiscoveredFile, ScanError, WalkerConfig};

/// Directory walker for parallel file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Compile the configured patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidPattern`] for the first pattern that is not
    /// a valid glob.
    pub fn build_matcher(&self) -> Result<Option<Override>, ScanError> {
        if self.config.patterns.is_empty() {
            return Ok(None);
        }

        let mut builder = OverrideBuilder::new(&self.root);
        for pattern in &self.config.patterns {
            builder
                .add(pattern)
                .map_err(|e| ScanError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
        }

        let matcher = builder.build().map_err(|e| ScanError::InvalidPattern {
            pattern: self.config.patterns.join(" "),
            reason: e.to_string(),
        })?;
        Ok(Some(matcher))
    }

    /// Check whether a file passes the pattern filter.
    fn is_selected(&self, path: &Path, matcher: Option<&Override>) -> bool {
        match matcher {
            Some(m) => !m.matched(path, false).is_ignore(),
            None => true,
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.config.exclude_paths.iter().any(|p| p == path)
    }

    /// Walk the directory tree, yielding candidate files.
    ///
    /// Errors for individual entries are yielded as [`ScanError`] values
    /// rather than stopping iteration. An invalid pattern is reported once as
    /// the only item.
    pub fn walk(&self) -> Box<dyn Iterator<Item = Result<DiscoveredFile, ScanError>> + '_> {
        let matcher = match self.build_matcher() {
            Ok(m) => m,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(self.config.skip_hidden)
            .process_read_dir(|_depth, _path, _read_dir_state, children| {
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        Box::new(walk_dir.into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            match entry_result {
                Ok(entry) => {
                    let path = entry.path();
                    if path == self.root {
                        return None;
                    }

                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }

                    if file_type.is_symlink() {
                        if !self.config.follow_symlinks {
                            log::trace!("Skipping symlink: {}", path.display());
                            return None;
                        }
                        // Dangling links and links to directories are not candidates.
                        if !path.is_file() {
                            return None;
                        }
                    } else if !file_type.is_file() {
                        return None;
                    }

                    if self.is_excluded(&path) {
                        log::trace!("Excluded: {}", path.display());
                        return None;
                    }

                    if !self.is_selected(&path, matcher.as_ref()) {
                        log::trace!("Not matched by patterns: {}", path.display());
                        return None;
                    }

                    if path.strip_prefix(&self.root).unwrap_or(&path).to_str().is_none() {
                        return Some(Err(ScanError::NonUtf8Path(path)));
                    }

                    let directory = entry.parent_path().to_path_buf();
                    Some(Ok(DiscoveredFile::new(directory, entry.file_name().to_owned())))
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    Some(Err(self.handle_jwalk_error(path, e)))
                }
            }
        }))
    }

    fn handle_jwalk_error(&self, path: PathBuf, error: jwalk::Error) -> ScanError {
        let io_error = error.into_io_error();
        match io_error {
            Some(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            Some(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("Vanished during walk: {}", path.display());
                ScanError::NotFound(path)
            }
            Some(e) => {
                log::warn!("I/O error walking {}: {}", path.display(), e);
                ScanError::Io { path, source: e }
            }
            None => {
                log::warn!("Walk error at {}", path.display());
                ScanError::Io {
                    path,
                    source: std::io::Error::other("directory walk failed"),
                }
            }
        }
    }
}
