//! Plain-text output.
//!
//! - [`print_content`]: every tracked file, grouped under its content hash
//! - [`print_duplicates`]: one line per duplicate group, paths separated by
//!   tabs, meant for `cut`/`awk` pipelines
//! - [`print_summary`]: a short human-readable report of the scan
//!
//! Colors come from `yansi` and are switched off globally with `--no-color`.
//! Duplicate lines are never colored.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::duplicates::{DuplicateGroup, GatherSummary, GroupStats};
use crate::store::DuplicateIndex;

/// Print every group: the hash, then one indented path per line.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn print_content<W: Write>(writer: &mut W, groups: &[DuplicateGroup]) -> io::Result<()> {
    for group in groups {
        writeln!(
            writer,
            "{} ({})",
            group.hash.to_hex().yellow(),
            ByteSize::b(group.size)
        )?;
        for path in &group.paths {
            writeln!(writer, "\t{}", path.display())?;
        }
    }
    Ok(())
}

/// Print each group of two or more files as a single tab-separated line.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn print_duplicates<W: Write>(writer: &mut W, groups: &[DuplicateGroup]) -> io::Result<()> {
    for group in groups.iter().filter(|g| g.is_duplicate()) {
        let line = group
            .paths
            .iter()
            .map(|p| p.to_string_lossy())
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

/// Print a short report of the scan and the store.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn print_summary<W: Write>(
    writer: &mut W,
    index: &DuplicateIndex,
    summary: &GatherSummary,
    groups: &[DuplicateGroup],
) -> io::Result<()> {
    let stats = GroupStats::from_groups(groups);

    writeln!(
        writer,
        "{} {} files ({}) tracked in {}",
        "Store:".bold(),
        index.len(),
        ByteSize::b(index.tracked_bytes()),
        index.root().display()
    )?;
    writeln!(
        writer,
        "{} {} seen, {} unchanged, {} hashed, {} removed in {:.2?}",
        "Scan:".bold(),
        summary.files_seen,
        summary.unchanged,
        summary.hashed,
        summary.removed,
        summary.duration
    )?;

    if stats.duplicate_groups == 0 {
        writeln!(writer, "{}", "No duplicates found.".green())?;
    } else {
        writeln!(
            writer,
            "{} {} groups, {} redundant copies, {} reclaimable",
            "Duplicates:".bold(),
            stats.duplicate_groups.to_string().red().bold(),
            stats.duplicate_files,
            ByteSize::b(stats.wasted_space).to_string().red()
        )?;
    }

    if summary.errors > 0 {
        writeln!(
            writer,
            "{} {} files could not be read",
            "Warning:".yellow().bold(),
            summary.errors
        )?;
    }
    if summary.store_reset {
        writeln!(
            writer,
            "{} previous store was unusable and has been rebuilt",
            "Note:".yellow()
        )?;
    }
    if !summary.persisted {
        writeln!(writer, "Store not saved.")?;
    }
    Ok(())
}
