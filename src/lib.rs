//! dupindex - incremental duplicate file finder
//!
//! dupindex finds files with identical content under a directory and keeps a
//! compressed index of what it hashed inside that directory, so later runs
//! only hash files that are new or whose size or modification time changed.
//!
//! # Modules
//!
//! - [`store`]: the persistent duplicate index and its on-disk format
//! - [`scanner`]: directory walking, path identities, fingerprints, hashing
//! - [`duplicates`]: the scan workflow and duplicate groups
//! - [`output`]: text and JSON presentation
//! - [`cli`], [`config`], [`logging`], [`progress`], [`signal`], [`error`]:
//!   the command-line application around them

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod store;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::duplicates::{content_groups, Gatherer, GathererConfig};
use crate::error::ExitCode;
use crate::output::JsonOutput;
use crate::progress::{Progress, ProgressCallback};

/// Run the application for parsed arguments.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the scan fails or is
/// interrupted, or the report cannot be written. An interrupted scan
/// surfaces as [`duplicates::GatherError::Interrupted`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref()).apply_cli(&cli);
    config.validate().context("Invalid configuration")?;
    log::debug!("Configuration: {:?}", config);

    let handler = signal::install_handler()?;

    let mut gatherer_config = GathererConfig::default()
        .with_io_threads(config.io_threads)
        .with_follow_symlinks(config.follow_symlinks)
        .with_skip_hidden(config.skip_hidden)
        .with_patterns(cli.patterns.clone())
        .with_store_file_name(config.store_file_name.clone())
        .with_mmap_threshold(config.mmap_threshold)
        .with_persist(!cli.no_store)
        .with_shutdown_flag(handler.get_flag());

    if cli.progress && !cli.quiet {
        let progress: Arc<dyn ProgressCallback> =
            Arc::new(Progress::with_plain(false, cli.no_color));
        gatherer_config = gatherer_config.with_progress_callback(progress);
    }

    let (index, summary) = Gatherer::new(gatherer_config)
        .run(&cli.directory)
        .with_context(|| format!("Failed to scan {}", cli.directory.display()))?;

    let exit_code = if summary.is_partial() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    };

    let groups = content_groups(&index);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.output {
        OutputFormat::Json => {
            JsonOutput::new(&index, &groups, &summary, cli.show_content, exit_code)
                .write_to(&mut out, true)
                .context("Failed to write JSON report")?;
        }
        OutputFormat::Text => {
            if cli.show_content {
                output::print_content(&mut out, &groups).context("Failed to print content")?;
            }
            if cli.show_duplicates {
                output::print_duplicates(&mut out, &groups)
                    .context("Failed to print duplicates")?;
            }
            if !cli.quiet {
                output::print_summary(&mut std::io::stderr().lock(), &index, &summary, &groups)
                    .context("Failed to print summary")?;
            }
        }
    }
    out.flush().context("Failed to flush output")?;

    Ok(exit_code)
}
