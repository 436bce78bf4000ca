//! Duplicate detection module.
//!
//! Detection runs as a multi-stage pipeline over the walker's stream:
//!
//! 1. **Size grouping**: bucket files by exact size. A unique size cannot
//!    be a duplicate; this eliminates most files without any I/O.
//! 2. **Prehash**: for same-sized files, hash the first 4 KiB. Files that
//!    differ early are rejected after a single small read.
//! 3. **Full hash**: files that still collide are hashed in full; equal
//!    digests become [`DuplicateGroup`]s.
//! 4. **Folder rollup**: file groups that together form byte-identical
//!    subtrees collapse into [`FolderGroup`]s.
//!
//! Hashing stages run on a bounded worker pool; all per-entry failures
//! land in the warning counters rather than aborting the run.

pub mod finder;
pub mod folders;
pub mod pool;
pub mod report;
mod spill;

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub use finder::DuplicateFinder;
pub use pool::{HashJob, HashPool, JobKind, JobOutcome};
pub use report::{
    Confidence, DuplicateGroup, FolderGroup, Report, ScanSummary, WarningCounters, WarningKind,
};

use crate::progress::{NoopSink, ProgressSink};
use crate::scanner::{CHUNK_SIZE, PREHASH_SIZE};

/// Configuration for a [`DuplicateFinder`] run.
///
/// The three detection modes of the original tool (standard, adaptive,
/// memory-efficient) are all expressed through this one struct: they
/// differ only in `workers`, `batch_size`, and `memory_efficient`.
#[derive(Clone)]
pub struct FinderConfig {
    /// Worker threads for the hash pool. `None` picks a value from the
    /// CPU count and disk kind.
    pub workers: Option<usize>,
    /// Bytes hashed per prehash. Default 4096.
    pub partial_size_bytes: u64,
    /// Read chunk for full hashing. Default 65536.
    pub chunk_size_bytes: usize,
    /// When non-zero, hash jobs are submitted and collected in waves of
    /// this many entries per size bucket. Default 0 (no batching).
    pub batch_size: usize,
    /// Spill size buckets to a temporary file during the walk so peak
    /// memory stays bounded on pathological trees.
    pub memory_efficient: bool,
    /// Skip all hashing and group by `(file name, size)` instead. Fast
    /// but approximate; the report is flagged accordingly.
    pub metadata_only: bool,
    /// Gitignore-style patterns excluded from the walk.
    pub ignore_patterns: Vec<String>,
    pub(crate) shutdown_flag: Option<Arc<AtomicBool>>,
    pub(crate) progress: Arc<dyn ProgressSink>,
}

impl FinderConfig {
    /// Set the worker count explicitly.
    #[must_use]
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// Set the prehash window in bytes.
    #[must_use]
    pub fn with_partial_size(mut self, bytes: u64) -> Self {
        self.partial_size_bytes = bytes;
        self
    }

    /// Set the full-hash read chunk in bytes.
    #[must_use]
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size_bytes = bytes;
        self
    }

    /// Set the per-bucket hashing batch size (0 disables batching).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable the disk-backed size buckets.
    #[must_use]
    pub fn with_memory_efficient(mut self, enabled: bool) -> Self {
        self.memory_efficient = enabled;
        self
    }

    /// Enable or disable metadata-only fast mode.
    #[must_use]
    pub fn with_metadata_only(mut self, enabled: bool) -> Self {
        self.metadata_only = enabled;
        self
    }

    /// Set gitignore-style walk exclusions.
    #[must_use]
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Attach a shutdown flag checked at walk and job boundaries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Attach a progress sink receiving lifecycle events.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            workers: None,
            partial_size_bytes: PREHASH_SIZE,
            chunk_size_bytes: CHUNK_SIZE,
            batch_size: 0,
            memory_efficient: false,
            metadata_only: false,
            ignore_patterns: Vec::new(),
            shutdown_flag: None,
            progress: Arc::new(NoopSink),
        }
    }
}

impl fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinderConfig")
            .field("workers", &self.workers)
            .field("partial_size_bytes", &self.partial_size_bytes)
            .field("chunk_size_bytes", &self.chunk_size_bytes)
            .field("batch_size", &self.batch_size)
            .field("memory_efficient", &self.memory_efficient)
            .field("metadata_only", &self.metadata_only)
            .field("ignore_patterns", &self.ignore_patterns)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finder_config_defaults() {
        let config = FinderConfig::default();
        assert_eq!(config.workers, None);
        assert_eq!(config.partial_size_bytes, 4096);
        assert_eq!(config.chunk_size_bytes, 65536);
        assert_eq!(config.batch_size, 0);
        assert!(!config.memory_efficient);
        assert!(!config.metadata_only);
    }

    #[test]
    fn test_finder_config_builders() {
        let config = FinderConfig::default()
            .with_workers(Some(4))
            .with_partial_size(1024)
            .with_batch_size(500)
            .with_memory_efficient(true);

        assert_eq!(config.workers, Some(4));
        assert_eq!(config.partial_size_bytes, 1024);
        assert_eq!(config.batch_size, 500);
        assert!(config.memory_efficient);
    }
}
