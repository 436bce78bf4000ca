//! Command-line interface definitions.
//!
//! # Example
//!
//! ```bash
//! # Scan a directory with text output (default)
//! dupescan ~/Downloads
//!
//! # Machine-readable output for scripting
//! dupescan ~/Downloads --output json --pretty
//!
//! # Bound memory on very large trees
//! dupescan /archive --memory-efficient --batch-size 1000
//!
//! # Fast approximate pass (name + size only)
//! dupescan ~/Downloads --metadata-only
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::scanner::{CHUNK_SIZE, PREHASH_SIZE};

/// Content-addressed duplicate detector.
///
/// Finds files with byte-identical contents under a directory, collapses
/// fully duplicated subtrees into folder-level matches, and prints a
/// text or JSON report.
#[derive(Debug, Parser)]
#[command(name = "dupescan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to scan for duplicates
    pub path: PathBuf,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Hash worker threads (default: picked from CPU count and disk kind)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Bytes hashed per quick prefix comparison
    #[arg(long, default_value_t = PREHASH_SIZE, value_name = "BYTES")]
    pub partial_bytes: u64,

    /// Read chunk for full-content hashing
    #[arg(long, default_value_t = CHUNK_SIZE, value_name = "BYTES")]
    pub chunk_bytes: usize,

    /// Hash files in waves of this many per size bucket (0 = all at once)
    #[arg(long, default_value_t = 0)]
    pub batch_size: usize,

    /// Spill size buckets to disk to bound memory on huge trees
    #[arg(long)]
    pub memory_efficient: bool,

    /// Group by file name and size only; skips all content hashing
    #[arg(long)]
    pub metadata_only: bool,

    /// Gitignore-style pattern to exclude (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress bars and all output except errors and the report
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Report output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Grouped human-readable sections
    Text,
    /// Stable machine-readable schema
    Json,
}
