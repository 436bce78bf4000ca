//! JSON report formatter.
//!
//! The schema is a public interface and must stay stable:
//!
//! ```json
//! {
//!   "duplicate_files": [
//!     {
//!       "hash": "abc123…",
//!       "size": 1024,
//!       "count": 2,
//!       "files": [
//!         { "path": "/t/a.txt", "size": 1024, "size_formatted": "1.0 KiB" }
//!       ]
//!     }
//!   ],
//!   "duplicate_folders": [
//!     {
//!       "digest": "def456…",
//!       "count": 2,
//!       "file_count": 10,
//!       "total_bytes": 4096,
//!       "folders": ["/t/photos", "/t/backup"]
//!     }
//!   ],
//!   "unique_files": [
//!     { "path": "/t/c.txt", "size": 5, "size_formatted": "5 B" }
//!   ],
//!   "statistics": { "total_files": 3, "...": "..." },
//!   "warnings": { "permission_denied": 1 }
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use bytesize::ByteSize;
use serde::Serialize;

use crate::duplicates::{DuplicateGroup, FolderGroup, Report, ScanSummary};

/// One file inside a group or the unique list.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Absolute path
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Human-readable size
    pub size_formatted: String,
}

impl JsonFile {
    fn new(path: &Path, size: u64) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            size,
            size_formatted: ByteSize::b(size).to_string(),
        }
    }
}

/// One duplicate file group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Content hash as 64 hex characters
    pub hash: String,
    /// File size in bytes
    pub size: u64,
    /// Number of files in the group
    pub count: usize,
    /// The member files
    pub files: Vec<JsonFile>,
}

impl JsonDuplicateGroup {
    fn from_group(group: &DuplicateGroup) -> Self {
        Self {
            hash: group.hash_hex(),
            size: group.size,
            count: group.len(),
            files: group
                .files
                .iter()
                .map(|p| JsonFile::new(p, group.size))
                .collect(),
        }
    }
}

/// One duplicate folder group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFolderGroup {
    /// Structural digest as 64 hex characters
    pub digest: String,
    /// Number of folders in the group
    pub count: usize,
    /// Files below each member
    pub file_count: u64,
    /// Bytes below each member
    pub total_bytes: u64,
    /// Human-readable total
    pub total_bytes_formatted: String,
    /// The member folders
    pub folders: Vec<String>,
}

impl JsonFolderGroup {
    fn from_group(group: &FolderGroup) -> Self {
        Self {
            digest: group.digest_hex(),
            count: group.len(),
            file_count: group.file_count,
            total_bytes: group.total_bytes,
            total_bytes_formatted: ByteSize::b(group.total_bytes).to_string(),
            folders: group
                .dirs
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics.
#[derive(Debug, Clone, Serialize)]
pub struct JsonStatistics {
    /// Total regular files discovered
    pub total_files: usize,
    /// Total bytes discovered
    pub total_bytes: u64,
    /// Duplicate file groups
    pub duplicate_groups: usize,
    /// Files across all duplicate groups
    pub duplicate_files: usize,
    /// Duplicate folder groups
    pub folder_groups: usize,
    /// Unique files
    pub unique_files: usize,
    /// Bytes reclaimable by deduplication
    pub reclaimable_bytes: u64,
    /// Hash workers used
    pub workers: usize,
    /// "full" or "metadata_only"
    pub confidence: String,
    /// Whether the run was interrupted
    pub interrupted: bool,
    /// End-to-end duration in milliseconds
    pub scan_duration_ms: u64,
    /// Walk phase in milliseconds
    pub walk_duration_ms: u64,
    /// Size grouping in milliseconds
    pub size_duration_ms: u64,
    /// Prehash phase in milliseconds
    pub prehash_duration_ms: u64,
    /// Full hash phase in milliseconds
    pub fullhash_duration_ms: u64,
    /// Folder rollup in milliseconds
    pub rollup_duration_ms: u64,
}

impl JsonStatistics {
    fn from_summary(s: &ScanSummary) -> Self {
        Self {
            total_files: s.total_files,
            total_bytes: s.total_bytes,
            duplicate_groups: s.duplicate_groups,
            duplicate_files: s.duplicate_files,
            folder_groups: s.folder_groups,
            unique_files: s.unique_files,
            reclaimable_bytes: s.reclaimable_bytes,
            workers: s.workers,
            confidence: s.confidence.as_str().to_string(),
            interrupted: s.interrupted,
            scan_duration_ms: s.scan_duration.as_millis() as u64,
            walk_duration_ms: s.walk_duration.as_millis() as u64,
            size_duration_ms: s.size_duration.as_millis() as u64,
            prehash_duration_ms: s.prehash_duration.as_millis() as u64,
            fullhash_duration_ms: s.fullhash_duration.as_millis() as u64,
            rollup_duration_ms: s.rollup_duration.as_millis() as u64,
        }
    }
}

/// Complete JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate file groups
    pub duplicate_files: Vec<JsonDuplicateGroup>,
    /// Duplicate folder groups
    pub duplicate_folders: Vec<JsonFolderGroup>,
    /// Unique files
    pub unique_files: Vec<JsonFile>,
    /// Summary statistics
    pub statistics: JsonStatistics,
    /// Non-fatal warning counts by kind
    pub warnings: BTreeMap<String, u64>,
}

impl JsonOutput {
    /// Build the JSON view of a report.
    #[must_use]
    pub fn new(report: &Report) -> Self {
        Self {
            duplicate_files: report
                .duplicate_files
                .iter()
                .map(JsonDuplicateGroup::from_group)
                .collect(),
            duplicate_folders: report
                .duplicate_folders
                .iter()
                .map(JsonFolderGroup::from_group)
                .collect(),
            unique_files: report
                .unique_files
                .iter()
                .map(|e| JsonFile::new(&e.path, e.size))
                .collect(),
            statistics: JsonStatistics::from_summary(&report.summary),
            warnings: report
                .warnings
                .iter()
                .map(|(kind, count)| (kind.as_str().to_string(), *count))
                .collect(),
        }
    }

    /// Serialize to a compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to a pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON (with a trailing newline) to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors from JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
