//! Presentation of the index contents.
//!
//! - [`console`]: content listing, tab-separated duplicate lines, text summary
//! - [`json`]: machine-readable report
//!
//! # Example
//!
//! ```no_run
//! use dupindex::duplicates::{content_groups, Gatherer};
//! use dupindex::output::console::print_duplicates;
//! use std::path::Path;
//!
//! let (index, _summary) = Gatherer::with_defaults().run(Path::new(".")).unwrap();
//! let groups = content_groups(&index);
//! print_duplicates(&mut std::io::stdout().lock(), &groups).unwrap();
//! ```

pub mod console;
pub mod json;

pub use console::{print_content, print_duplicates, print_summary};
pub use json::JsonOutput;
