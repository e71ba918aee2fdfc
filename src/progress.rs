//! Progress reporting using indicatif.
//!
//! The gatherer reports two phases through [`ProgressCallback`]:
//!
//! - [`PHASE_WALKING`]: a spinner counting discovered files
//! - [`PHASE_HASHING`]: a bar over the files whose content must be hashed
//!
//! [`Progress`] draws them on stderr. Plain mode (used with `--no-color`)
//! swaps the spinner and Unicode bar for static ASCII.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Phase name for directory traversal.
pub const PHASE_WALKING: &str = "walking";

/// Phase name for content hashing.
pub const PHASE_HASHING: &str = "hashing";

/// Progress callback for the scan phases.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// * `phase` - Name of the phase ([`PHASE_WALKING`] or [`PHASE_HASHING`])
    /// * `total` - Number of items to process (0 when unknown)
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// * `current` - Items processed so far (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, with its size in bytes.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);
}

/// Progress reporter drawing indicatif bars on stderr.
pub struct Progress {
    multi: MultiProgress,
    walking: Mutex<Option<ProgressBar>>,
    hashing: Mutex<Option<ProgressBar>>,
    quiet: bool,
    plain: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// * `quiet` - If true, nothing is drawn.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupindex::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self::with_plain(quiet, false)
    }

    /// Create a progress reporter, optionally without animation or Unicode.
    #[must_use]
    pub fn with_plain(quiet: bool, plain: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            walking: Mutex::new(None),
            hashing: Mutex::new(None),
            quiet,
            plain,
        }
    }

    /// Whether plain mode is enabled.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.plain
    }

    fn walking_style(&self) -> ProgressStyle {
        if self.plain {
            ProgressStyle::with_template("{msg} [{elapsed_precise}] {pos} files")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        } else {
            ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        }
    }

    fn hashing_style(&self) -> ProgressStyle {
        if self.plain {
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
        } else {
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} {per_sec} (ETA: {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
        }
    }

    fn slot(&self, phase: &str) -> Option<&Mutex<Option<ProgressBar>>> {
        match phase {
            PHASE_WALKING => Some(&self.walking),
            PHASE_HASHING => Some(&self.hashing),
            _ => None,
        }
    }

    /// The bar of the most recently started phase that is still running.
    fn active(&self) -> Option<ProgressBar> {
        [&self.hashing, &self.walking]
            .into_iter()
            .find_map(|slot| slot.lock().ok().and_then(|bar| bar.clone()))
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = if phase == PHASE_WALKING {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(self.walking_style());
            pb.set_message("Walking directory");
            let tick_rate = if self.plain { 500 } else { 100 };
            pb.enable_steady_tick(Duration::from_millis(tick_rate));
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(self.hashing_style());
            pb.set_message("Hashing");
            pb
        };

        match self.slot(phase) {
            Some(slot) => {
                if let Ok(mut guard) = slot.lock() {
                    *guard = Some(pb);
                }
            }
            None => log::debug!("Unknown progress phase: {}", phase),
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active() {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 30));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let finished = self
            .slot(phase)
            .and_then(|slot| slot.lock().ok().and_then(|mut bar| bar.take()));
        if let Some(pb) = finished {
            let message = if phase == PHASE_WALKING {
                "Walking complete"
            } else {
                "Hashing complete"
            };
            pb.finish_with_message(message);
        }
    }
}

/// Shorten a path for display, keeping the tail of its file name.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len >= max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_path_unchanged() {
        assert_eq!(truncate_path("a/b.txt", 30), "a/b.txt");
    }

    #[test]
    fn test_truncate_long_path_keeps_file_name() {
        let path = "some/very/long/directory/structure/leading/to/file.txt";
        assert_eq!(truncate_path(path, 30), ".../file.txt");
    }

    #[test]
    fn test_truncate_long_file_name() {
        let name = "x".repeat(40);
        let truncated = truncate_path(&format!("dir/{name}"), 30);
        assert_eq!(truncated.chars().count(), 30);
        assert!(truncated.starts_with("..."));
    }

    #[test]
    fn test_truncate_multibyte_file_name() {
        let name = "é".repeat(40);
        let truncated = truncate_path(&name, 10);
        assert_eq!(truncated, format!("...{}", "é".repeat(7)));
    }

    #[test]
    fn test_quiet_progress_ignores_events() {
        let progress = Progress::new(true);
        progress.on_phase_start(PHASE_WALKING, 0);
        progress.on_progress(1, "a.txt");
        progress.on_phase_end(PHASE_WALKING);
        assert!(progress.active().is_none());
    }

    #[test]
    fn test_phase_lifecycle() {
        let progress = Progress::with_plain(false, true);
        assert!(progress.is_plain());

        progress.on_phase_start(PHASE_HASHING, 3);
        progress.on_progress(1, "a.txt");
        assert_eq!(progress.active().map(|pb| pb.position()), Some(1));

        progress.on_phase_end(PHASE_HASHING);
        assert!(progress.active().is_none());
    }
}
