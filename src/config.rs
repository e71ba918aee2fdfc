//! Layered configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file: the `--config` path, else `config.toml` in the platform
//!    configuration directory
//! 3. Environment variables prefixed with `DUPINDEX_` (e.g. `DUPINDEX_IO_THREADS=8`)
//! 4. Command-line flags ([`Config::apply_cli`])
//!
//! # Example
//!
//! ```toml
//! io_threads = 8
//! skip_hidden = true
//! store_file_name = ".dupindex.json.gz"
//! ```

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::cli::Cli;
use crate::scanner::hasher::DEFAULT_MMAP_THRESHOLD;
use crate::store::DEFAULT_STORE_FILE_NAME;

/// Environment variable prefix for configuration keys.
pub const ENV_PREFIX: &str = "DUPINDEX_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of threads used for content hashing.
    pub io_threads: usize,
    /// Follow symbolic links while walking.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Name of the store file inside the scanned directory.
    pub store_file_name: String,
    /// Files at least this large (in bytes) are hashed through a memory map.
    pub mmap_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_threads: 4,
            follow_symlinks: false,
            skip_hidden: false,
            store_file_name: DEFAULT_STORE_FILE_NAME.to_string(),
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }
}

impl Config {
    /// Load the configuration, falling back to defaults on any error.
    ///
    /// `path` overrides the platform configuration file.
    #[must_use]
    pub fn load(path: Option<&Path>) -> Self {
        match Self::figment(path).extract() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// The provider stack behind [`load`](Self::load).
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let file = path.map(Path::to_path_buf).or_else(Self::config_path);
        if let Some(file) = file {
            log::trace!("Reading config from {}", file.display());
            figment = figment.merge(Toml::file(file));
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Default platform-specific configuration file.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "dupindex", "dupindex")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Let command-line flags override the loaded values.
    #[must_use]
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(threads) = cli.io_threads {
            self.io_threads = threads;
        }
        self.follow_symlinks |= cli.follow_symlinks;
        self.skip_hidden |= cli.skip_hidden;
        self
    }

    /// Reject values the scan cannot work with.
    ///
    /// # Errors
    ///
    /// Fails if `io_threads` is zero or `store_file_name` is not a plain
    /// file name.
    pub fn validate(&self) -> Result<()> {
        if self.io_threads == 0 {
            bail!("io_threads must be at least 1");
        }

        let mut components = Path::new(&self.store_file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => Err(anyhow::anyhow!("{:?}", self.store_file_name))
                .context("store_file_name must be a plain file name"),
        }
    }
}
