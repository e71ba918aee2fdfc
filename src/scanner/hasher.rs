//! BLAKE3 content hasher.
//!
//! # Overview
//!
//! [`Hasher`] computes the [`ContentHash`] of a file. This is the expensive
//! operation the index exists to avoid, so it is only invoked for files whose
//! fingerprint does not match a stored record.
//!
//! Small files are streamed through a fixed buffer. Files at or above the
//! memory-map threshold are handed to BLAKE3's mmap reader, which also
//! spreads the tree hashing across the rayon pool.
//!
//! # Example
//!
//! ```no_run
//! use dupindex::scanner::Hasher;
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let hash = hasher.content_hash(Path::new("some/file.bin")).unwrap();
//! println!("{hash}");
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::HashError;

/// Read buffer for streaming hashing.
const BUFFER_SIZE: usize = 64 * 1024;

/// Default size at which files are hashed through a memory map (64 MiB).
pub const DEFAULT_MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;

super::hex_digest! {
    /// BLAKE3 hash of a file's bytes.
    ///
    /// Equal content hashes are treated as equal content.
    ContentHash
}

/// Streaming BLAKE3 file hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    mmap_threshold: u64,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default memory-map threshold.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
            shutdown_flag: None,
        }
    }

    /// Files at least this many bytes long are hashed through a memory map.
    ///
    /// `u64::MAX` disables memory mapping entirely.
    #[must_use]
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }

    /// Abort long reads when the flag becomes `true`.
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

    /// Hash the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read, or
    /// [`HashError::Interrupted`] if shutdown was requested mid-read.
    pub fn content_hash(&self, path: &Path) -> Result<ContentHash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        let mut hasher = blake3::Hasher::new();

        if len >= self.mmap_threshold && len > 0 {
            log::trace!("Hashing {} via mmap ({} bytes)", path.display(), len);
            drop(file);
            hasher
                .update_mmap_rayon(path)
                .map_err(|e| HashError::from_io(path, e))?;
        } else {
            self.stream_into(&mut hasher, file, path)?;
        }

        Ok(ContentHash::from_bytes(*hasher.finalize().as_bytes()))
    }

    fn stream_into(
        &self,
        hasher: &mut blake3::Hasher,
        mut file: File,
        path: &Path,
    ) -> Result<(), HashError> {
        let mut buffer = vec![0u8; BUFFER_SIZE];
        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted(path.to_path_buf()));
            }
            let n = match file.read(&mut buffer) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..n]);
        }
    }
}

/// Hash the content of a file with default settings.
///
/// # Errors
///
/// See [`Hasher::content_hash`].
pub fn content_hash_of(path: &Path) -> Result<ContentHash, HashError> {
    Hasher::new().content_hash(path)
}
