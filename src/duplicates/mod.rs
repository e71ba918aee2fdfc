//! Duplicate detection on top of the persistent index.
//!
//! - [`gatherer`]: the scan workflow that keeps the index in sync with a directory
//! - [`groups`]: duplicate groups for presentation

pub mod gatherer;
pub mod groups;

pub use gatherer::{GatherError, GatherSummary, Gatherer, GathererConfig};
pub use groups::{content_groups, duplicate_groups, DuplicateGroup, GroupStats};
