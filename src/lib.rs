//! dupescan: content-addressed duplicate detector for local trees.
//!
//! Given a root directory, dupescan streams every regular file through a
//! three-stage filter (size → prefix hash → full BLAKE3 hash) on a
//! bounded worker pool, then collapses fully duplicated subtrees into
//! folder-level groups. The result is an immutable [`duplicates::Report`]
//! that the [`output`] formatters render as text or JSON.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default());
//! let report = finder.find_duplicates(Path::new("/data")).unwrap();
//! for group in &report.duplicate_files {
//!     println!("{} copies of {} bytes", group.len(), group.size);
//! }
//! ```

pub mod cli;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
