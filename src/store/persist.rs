//! Load and save the duplicate index.
//!
//! The index lives next to the data it describes: a gzip-compressed JSON file
//! (by default `.duplicates.json.gz`) at the top of the scanned directory.
//! The JSON is wrapped in an envelope carrying a format version, the root the
//! index was built for, and a SHA-256 checksum of the serialized index.
//!
//! Saving goes through a temporary sibling file and a rename, so a crash or
//! interrupt mid-save leaves the previous store intact.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{DuplicateIndex, StoreError, StoreResult};

/// Current version of the store file format.
pub const STORE_VERSION: u32 = 2;

/// File name of the store inside the scanned root.
pub const DEFAULT_STORE_FILE_NAME: &str = ".duplicates.json.gz";

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    checksum: String,
    root: &'a Path,
    store: &'a DuplicateIndex,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    checksum: String,
    root: PathBuf,
    store: DuplicateIndex,
}

/// SHA-256 of the compact JSON form of the index.
fn checksum(index: &DuplicateIndex) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(index)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Sibling file a save writes to before renaming it into place.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl DuplicateIndex {
    /// Serialize the index into the compressed envelope format.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] (attributed to `path`) if encoding fails.
    pub fn encode(&self, path: &Path) -> StoreResult<Vec<u8>> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        let envelope = EnvelopeRef {
            version: STORE_VERSION,
            checksum: checksum(self).map_err(|e| io_err(e.into()))?,
            root: self.root(),
            store: self,
        };
        let json = serde_json::to_vec_pretty(&envelope).map_err(|e| io_err(e.into()))?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json).map_err(io_err)?;
        encoder.finish().map_err(io_err)
    }

    /// Save the index to `path`, replacing any previous store atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let bytes = self.encode(path)?;
        let tmp = temp_path(path);
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        {
            let file = File::create(&tmp).map_err(io_err)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&bytes).map_err(io_err)?;
            writer
                .into_inner()
                .map_err(|e| io_err(e.into_error()))?
                .sync_all()
                .map_err(io_err)?;
        }

        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(e));
        }

        log::debug!(
            "Saved store with {} files to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }

    /// Load the index for `root` from `path`.
    ///
    /// A missing file yields an empty index.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Corrupt`] if the file cannot be decoded, has an
    ///   unsupported version, fails its checksum, or holds inconsistent indices
    /// - [`StoreError::RootMismatch`] if it was saved for another root
    /// - [`StoreError::Io`] if it exists but cannot be read
    pub fn open(root: &Path, path: &Path) -> StoreResult<Self> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No store at {}, starting empty", path.display());
                return Ok(Self::new(root));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let corrupt = |reason: String| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let mut json = String::new();
        GzDecoder::new(BufReader::new(file))
            .read_to_string(&mut json)
            .map_err(|e| corrupt(format!("cannot decompress: {e}")))?;

        let envelope: Envelope =
            serde_json::from_str(&json).map_err(|e| corrupt(format!("cannot parse: {e}")))?;

        if envelope.version != STORE_VERSION {
            return Err(corrupt(format!(
                "unsupported version {} (expected {})",
                envelope.version, STORE_VERSION
            )));
        }

        let calculated = checksum(&envelope.store)
            .map_err(|e| corrupt(format!("cannot re-serialize: {e}")))?;
        if calculated != envelope.checksum {
            return Err(corrupt("checksum mismatch".to_string()));
        }

        if envelope.root != root {
            return Err(StoreError::RootMismatch {
                recorded: envelope.root,
                current: root.to_path_buf(),
            });
        }

        let mut index = envelope.store;
        index.set_root(root.to_path_buf());
        index
            .check_invariants()
            .map_err(|e| corrupt(e.to_string()))?;

        log::debug!(
            "Loaded store with {} files from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }
}
