//! Command-line interface definitions.
//!
//! # Example
//!
//! ```bash
//! # Index ~/Pictures and print duplicate groups, one tab-separated line each
//! dupindex --show-duplicates ~/Pictures
//!
//! # Only consider images, show progress bars
//! dupindex --progress --show-content ~/Pictures '*.png' '*.jpg'
//!
//! # Exclude a pattern, machine-readable report, leave the store untouched
//! dupindex --output json --no-store ~/Downloads '!*.part'
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Find duplicate files, remembering what was already hashed.
///
/// dupindex keeps a compressed index of file hashes inside the analysed
/// directory so that later runs only hash new or modified files.
#[derive(Debug, Parser)]
#[command(name = "dupindex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to analyse
    #[arg(value_name = "DIRECTORY")]
    pub directory: PathBuf,

    /// Shell-style patterns selecting the files to analyse (e.g. '*.png')
    ///
    /// A file is analysed if it matches any pattern. Prefix a pattern with
    /// '!' to exclude matching files. Without patterns every file is analysed.
    #[arg(value_name = "PATTERNS")]
    pub patterns: Vec<String>,

    /// Print every tracked file, grouped by content hash
    #[arg(long)]
    pub show_content: bool,

    /// Print one line per duplicate group, paths separated by tabs
    #[arg(long)]
    pub show_duplicates: bool,

    /// Output format for the report
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Show progress bars on stderr
    #[arg(long)]
    pub progress: bool,

    /// Do not save the gathered information
    #[arg(long)]
    pub no_store: bool,

    /// Follow symbolic links during the scan
    ///
    /// Warning: May cause infinite loops if symlinks form cycles.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Number of threads for content hashing [config default: 4]
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Configuration file to use instead of the platform default
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report errors as JSON objects on stderr
    #[arg(long)]
    pub json_errors: bool,
}

impl Cli {
    /// Patterns as recorded in the store: `None` when every file is analysed.
    #[must_use]
    pub fn filters(&self) -> Option<Vec<String>> {
        if self.patterns.is_empty() {
            None
        } else {
            Some(self.patterns.clone())
        }
    }
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
