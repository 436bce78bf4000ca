//! Scanner module for directory traversal and file hashing.
//!
//! The scanner is divided into submodules:
//! - [`walker`]: streaming directory traversal and file discovery
//! - [`hasher`]: BLAKE3 content hashing (prehash and full)
//!
//! # Example
//!
//! ```no_run
//! use dupescan::scanner::{Walker, WalkerConfig, WalkedItem};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for item in walker.walk() {
//!     match item {
//!         Ok(WalkedItem::File(file)) => {
//!             println!("{}: {} bytes", file.path.display(), file.size);
//!         }
//!         Ok(WalkedItem::Dir(dir)) => println!("{}/", dir.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use hasher::{empty_hash, hash_to_hex, hex_to_hash, Hash, Hasher, CHUNK_SIZE, PREHASH_SIZE};
pub use walker::Walker;

/// Metadata for a discovered regular file.
///
/// Immutable once emitted by the walker; everything the pipeline needs
/// before content is read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FileEntry {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileEntry {
    /// Create a new file entry.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }
}

/// One item yielded by the walker.
///
/// Directories are surfaced alongside files so the folder rollup can
/// reconstruct the tree exactly as the walk observed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkedItem {
    /// A regular file (or a file symlink resolved to a regular target).
    File(FileEntry),
    /// A directory below the root.
    Dir(PathBuf),
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Glob patterns to ignore (gitignore-style), applied in addition
    /// to a `.gitignore` file at the root if one exists.
    pub ignore_patterns: Vec<String>,
}

impl WalkerConfig {
    /// Set glob patterns to ignore.
    #[must_use]
    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }
}

/// Non-fatal errors encountered while walking the tree.
///
/// Each variant is counted by the warning collector; the offending entry
/// is skipped and the walk continues.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when reading a directory or entry metadata.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// A symlink whose target does not exist.
    #[error("Broken symlink: {0}")]
    BrokenSymlink(PathBuf),

    /// An entry disappeared between discovery and stat.
    #[error("File vanished during scan: {0}")]
    Vanished(PathBuf),

    /// A symlink resolving to something other than a regular file.
    #[error("Not a regular file: {0}")]
    NotRegularFile(PathBuf),

    /// Any other I/O error while enumerating the tree.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal errors encountered while hashing a file.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file disappeared between discovery and hashing.
    #[error("File vanished during scan: {0}")]
    Vanished(PathBuf),

    /// Permission was denied when opening or reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Any other read failure.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_entry_new() {
        let entry = FileEntry::new(PathBuf::from("/test/file.txt"), 1024);
        assert_eq!(entry.path, PathBuf::from("/test/file.txt"));
        assert_eq!(entry.size, 1024);
    }

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::PermissionDenied(PathBuf::from("/test"));
        assert_eq!(err.to_string(), "Permission denied: /test");

        let err = ScanError::BrokenSymlink(PathBuf::from("/link"));
        assert_eq!(err.to_string(), "Broken symlink: /link");

        let err = ScanError::Vanished(PathBuf::from("/gone"));
        assert_eq!(err.to_string(), "File vanished during scan: /gone");
    }

    #[test]
    fn test_hash_error_display() {
        let err = HashError::Vanished(PathBuf::from("/gone"));
        assert_eq!(err.to_string(), "File vanished during scan: /gone");

        let err = HashError::PermissionDenied(PathBuf::from("/secret"));
        assert_eq!(err.to_string(), "Permission denied: /secret");
    }
}
