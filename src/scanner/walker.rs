//! Streaming directory walker built on jwalk.
//!
//! The walker yields one [`WalkedItem`] per directory entry below the
//! root: regular files with their sizes, and directories so the folder
//! rollup can rebuild the tree the walk actually observed. Entries are
//! yielded lazily; nothing accumulates a full path list in memory.
//!
//! Traversal rules:
//! - Directory entries are sorted by name, so iteration order is stable
//!   across runs on an unchanged tree.
//! - Directory symlinks are never followed. File symlinks resolve to the
//!   target's size and content when the target is a regular file; a
//!   missing target yields a [`ScanError::BrokenSymlink`] warning and a
//!   non-regular target yields [`ScanError::NotRegularFile`].
//! - Devices, FIFOs, and sockets are skipped silently.
//! - Per-entry errors (permission, vanished files) are yielded as
//!   warnings; the rest of the tree is still walked.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;

use super::{FileEntry, ScanError, WalkedItem, WalkerConfig};

/// Directory walker for streaming file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag becomes `true`, the walker stops before the next
    /// entry.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build gitignore matcher from config patterns and a root `.gitignore`.
    fn build_gitignore(&self) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(&self.root);

        let gitignore_path = self.root.join(".gitignore");
        if gitignore_path.exists() {
            if let Some(e) = builder.add(&gitignore_path) {
                log::warn!(
                    "Failed to load .gitignore from {}: {}",
                    gitignore_path.display(),
                    e
                );
            }
        }

        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) => {
                if gitignore.is_empty() {
                    None
                } else {
                    Some(gitignore)
                }
            }
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Check if a path matches the configured ignore patterns.
    fn should_ignore(&self, path: &Path, is_dir: bool, gitignore: &Option<Gitignore>) -> bool {
        if let Some(gi) = gitignore {
            let relative_path = path.strip_prefix(&self.root).unwrap_or(path);
            let path_str = relative_path.to_string_lossy();
            let normalized_path = if cfg!(windows) {
                path_str.replace('\\', "/")
            } else {
                path_str.into_owned()
            };

            gi.matched(normalized_path, is_dir).is_ignore()
        } else {
            false
        }
    }

    /// Walk the tree, yielding files, directories, and per-entry warnings.
    ///
    /// Returns a lazy iterator; errors are yielded as [`ScanError`]
    /// values rather than stopping iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<WalkedItem, ScanError>> + '_ {
        let gitignore = self.build_gitignore();

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .skip_hidden(false)
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                // Sort children for deterministic output
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        walk_dir
            .into_iter()
            .take_while(move |_| !self.is_shutdown_requested())
            .filter_map(move |entry_result| {
                let entry = match entry_result {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e
                            .path()
                            .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                        return Some(Err(map_jwalk_error(path, &e)));
                    }
                };

                let path = entry.path();

                // Skip the root directory itself
                if path == self.root {
                    return None;
                }

                let file_type = entry.file_type();

                if file_type.is_dir() {
                    if self.should_ignore(&path, true, &gitignore) {
                        log::trace!("Ignoring directory: {}", path.display());
                        return None;
                    }
                    return Some(Ok(WalkedItem::Dir(path)));
                }

                if self.should_ignore(&path, false, &gitignore) {
                    log::trace!("Ignoring file: {}", path.display());
                    return None;
                }

                if file_type.is_symlink() {
                    return self.resolve_symlink(path);
                }

                if !file_type.is_file() {
                    // Devices, FIFOs, sockets
                    log::trace!("Skipping special file: {}", path.display());
                    return None;
                }

                match std::fs::symlink_metadata(&path) {
                    Ok(metadata) if metadata.is_file() => {
                        Some(Ok(WalkedItem::File(FileEntry::new(path, metadata.len()))))
                    }
                    // Changed type between readdir and stat
                    Ok(_) => None,
                    Err(e) => Some(Err(map_stat_error(path, e))),
                }
            })
    }

    /// Resolve a file symlink to its target.
    fn resolve_symlink(&self, path: PathBuf) -> Option<Result<WalkedItem, ScanError>> {
        match std::fs::metadata(&path) {
            Ok(target) => {
                if target.is_dir() {
                    // Directory symlinks are not followed
                    log::trace!("Skipping directory symlink: {}", path.display());
                    None
                } else if target.is_file() {
                    Some(Ok(WalkedItem::File(FileEntry::new(path, target.len()))))
                } else {
                    Some(Err(ScanError::NotRegularFile(path)))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Some(Err(ScanError::BrokenSymlink(path)))
            }
            Err(e) => Some(Err(map_stat_error(path, e))),
        }
    }
}

fn map_stat_error(path: PathBuf, error: std::io::Error) -> ScanError {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::PermissionDenied => ScanError::PermissionDenied(path),
        ErrorKind::NotFound => ScanError::Vanished(path),
        _ => ScanError::Io {
            path,
            source: error,
        },
    }
}

fn map_jwalk_error(path: PathBuf, error: &jwalk::Error) -> ScanError {
    if let Some(io) = error.io_error() {
        if io.kind() == std::io::ErrorKind::PermissionDenied {
            return ScanError::PermissionDenied(path);
        }
        if io.kind() == std::io::ErrorKind::NotFound {
            return ScanError::Vanished(path);
        }
    }
    ScanError::Io {
        path,
        source: std::io::Error::other(error.to_string()),
    }
}
