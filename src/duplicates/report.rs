//! Scan results: duplicate groups, folder groups, summary, warnings.
//!
//! Everything in this module is constructed once at the end of its phase
//! and immutable afterwards. The [`Report`] is the sole return value of a
//! successful scan.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::scanner::{hash_to_hex, FileEntry, Hash, HashError, ScanError};

/// A confirmed group of files with identical content.
///
/// Always holds at least two members; members are sorted
/// lexicographically by path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash shared by every member (32 bytes)
    pub hash: Hash,
    /// File size in bytes, identical across members
    pub size: u64,
    /// Paths of all files in the group
    pub files: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Create a new duplicate group.
    #[must_use]
    pub fn new(hash: Hash, size: u64, files: Vec<PathBuf>) -> Self {
        Self { hash, size, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all copies.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.size * self.files.len() as u64
    }

    /// Space reclaimable by keeping a single copy.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * (self.files.len() as u64).saturating_sub(1)
    }

    /// Hash as a hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hash_to_hex(&self.hash)
    }
}

/// A group of directories whose complete recursive contents are identical.
///
/// Always holds at least two members; no member is an ancestor of another
/// member of the same group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderGroup {
    /// Recursive structural digest shared by every member
    pub digest: Hash,
    /// Paths of all directories in the group, sorted
    pub dirs: Vec<PathBuf>,
    /// Number of files below each member (transitively)
    pub file_count: u64,
    /// Total bytes below each member (transitively)
    pub total_bytes: u64,
}

impl FolderGroup {
    /// Number of directories in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Space reclaimable by keeping a single subtree.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.total_bytes * (self.dirs.len() as u64).saturating_sub(1)
    }

    /// Digest as a hexadecimal string.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hash_to_hex(&self.digest)
    }

    /// Check whether `path` lies below one of this group's members.
    #[must_use]
    pub fn covers(&self, path: &Path) -> bool {
        self.dirs
            .iter()
            .any(|dir| path != dir && path.starts_with(dir))
    }
}

/// How trustworthy the duplicate groups are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Groups are backed by full content hashes.
    Full,
    /// Groups were formed from name and size only (fast mode).
    MetadataOnly,
}

impl Confidence {
    /// Stable string form used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::MetadataOnly => "metadata_only",
        }
    }
}

/// Classification of non-fatal per-entry errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Permission denied on readdir, stat, or read.
    PermissionDenied,
    /// A symlink whose target does not exist.
    BrokenSymlink,
    /// A file that disappeared mid-run.
    Vanished,
    /// Any other read failure.
    IoError,
    /// A symlink resolving to a non-regular target.
    NotRegularFile,
}

impl WarningKind {
    /// All kinds, in stable report order.
    pub const ALL: [WarningKind; 5] = [
        WarningKind::PermissionDenied,
        WarningKind::BrokenSymlink,
        WarningKind::Vanished,
        WarningKind::IoError,
        WarningKind::NotRegularFile,
    ];

    /// Stable string form used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::BrokenSymlink => "broken_symlink",
            Self::Vanished => "vanished",
            Self::IoError => "io_error",
            Self::NotRegularFile => "not_regular_file",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::PermissionDenied => 0,
            Self::BrokenSymlink => 1,
            Self::Vanished => 2,
            Self::IoError => 3,
            Self::NotRegularFile => 4,
        }
    }
}

impl From<&ScanError> for WarningKind {
    fn from(err: &ScanError) -> Self {
        match err {
            ScanError::PermissionDenied(_) => Self::PermissionDenied,
            ScanError::BrokenSymlink(_) => Self::BrokenSymlink,
            ScanError::Vanished(_) => Self::Vanished,
            ScanError::NotRegularFile(_) => Self::NotRegularFile,
            ScanError::Io { .. } => Self::IoError,
        }
    }
}

impl From<&HashError> for WarningKind {
    fn from(err: &HashError) -> Self {
        match err {
            HashError::Vanished(_) => Self::Vanished,
            HashError::PermissionDenied(_) => Self::PermissionDenied,
            HashError::Io { .. } => Self::IoError,
        }
    }
}

/// Aggregates non-fatal warnings by kind.
///
/// The counters are the only shared mutable state the pipeline exposes
/// concurrently; updates are atomic.
#[derive(Debug, Default)]
pub struct WarningCounters {
    counts: [AtomicU64; 5],
}

impl WarningCounters {
    /// Create a fresh set of zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one warning of the given kind.
    pub fn record(&self, kind: WarningKind) {
        self.counts[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Current count for one kind.
    #[must_use]
    pub fn count(&self, kind: WarningKind) -> u64 {
        self.counts[kind.index()].load(Ordering::Relaxed)
    }

    /// Total count across all kinds.
    #[must_use]
    pub fn total(&self) -> u64 {
        WarningKind::ALL.iter().map(|k| self.count(*k)).sum()
    }

    /// Snapshot of the non-zero counts in stable order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(WarningKind, u64)> {
        WarningKind::ALL
            .iter()
            .map(|k| (*k, self.count(*k)))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

/// Summary statistics for a completed scan.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Total regular files discovered by the walk
    pub total_files: usize,
    /// Total size of all discovered files in bytes
    pub total_bytes: u64,
    /// Number of duplicate file groups in the final report
    pub duplicate_groups: usize,
    /// Total files across all duplicate groups
    pub duplicate_files: usize,
    /// Number of duplicate folder groups
    pub folder_groups: usize,
    /// Number of unique files
    pub unique_files: usize,
    /// Bytes reclaimable by keeping one copy per group
    pub reclaimable_bytes: u64,
    /// Worker threads the hash pool ran with
    pub workers: usize,
    /// Whether groups are content-verified or metadata-only
    pub confidence: Confidence,
    /// Whether the scan was interrupted (a report still exists only
    /// when the interruption arrived after the pipeline finished)
    pub interrupted: bool,
    /// Walk phase duration
    pub walk_duration: Duration,
    /// Size-grouping phase duration
    pub size_duration: Duration,
    /// Prehash phase duration
    pub prehash_duration: Duration,
    /// Full-hash phase duration
    pub fullhash_duration: Duration,
    /// Folder rollup duration
    pub rollup_duration: Duration,
    /// End-to-end duration
    pub scan_duration: Duration,
}

impl Default for ScanSummary {
    fn default() -> Self {
        Self {
            total_files: 0,
            total_bytes: 0,
            duplicate_groups: 0,
            duplicate_files: 0,
            folder_groups: 0,
            unique_files: 0,
            reclaimable_bytes: 0,
            workers: 1,
            confidence: Confidence::Full,
            interrupted: false,
            walk_duration: Duration::ZERO,
            size_duration: Duration::ZERO,
            prehash_duration: Duration::ZERO,
            fullhash_duration: Duration::ZERO,
            rollup_duration: Duration::ZERO,
            scan_duration: Duration::ZERO,
        }
    }
}

/// The complete result of a scan.
#[derive(Debug, Clone)]
pub struct Report {
    /// Duplicate file groups, sorted by (descending size, first path)
    pub duplicate_files: Vec<DuplicateGroup>,
    /// Duplicate folder groups
    pub duplicate_folders: Vec<FolderGroup>,
    /// Files with no duplicate, sorted by path
    pub unique_files: Vec<FileEntry>,
    /// Summary statistics
    pub summary: ScanSummary,
    /// Non-zero warning counts by kind, in stable order
    pub warnings: Vec<(WarningKind, u64)>,
}

impl Report {
    /// Whether any duplicate files or folders were found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.duplicate_files.is_empty() || !self.duplicate_folders.is_empty()
    }
}
