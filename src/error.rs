//! Fatal errors and process exit codes.

use std::path::PathBuf;

/// Exit codes for the dupescan CLI.
///
/// - 0: Success (completed normally, whether or not duplicates were found)
/// - 1: Fatal error (root missing, not a directory, or unreadable)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Scan completed and a report was produced.
    Success = 0,
    /// A fatal error aborted the scan before a report could be produced.
    FatalError = 1,
    /// The scan was interrupted by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Errors that abort a scan outright.
///
/// Non-fatal per-entry errors (permission denied on a single file, broken
/// symlinks, files vanishing mid-run) never surface here; they are counted
/// by the warning collector and the affected entry is skipped. A
/// `FatalError` means no [`Report`](crate::duplicates::Report) exists.
#[derive(thiserror::Error, Debug)]
pub enum FatalError {
    /// The scan root does not exist.
    #[error("Path not found: {0}")]
    RootNotFound(PathBuf),

    /// The scan root exists but is not a directory.
    #[error("Not a directory: {0}")]
    RootNotDirectory(PathBuf),

    /// The scan root could not be opened or resolved.
    #[error("Cannot read {path}: {source}")]
    RootUnreadable {
        /// The offending root path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The scratch storage used by memory-efficient mode failed.
    #[error("Scratch storage error: {0}")]
    Scratch(#[source] std::io::Error),

    /// The scan was cancelled before completion.
    #[error("Scan interrupted")]
    Interrupted,
}

impl FatalError {
    /// Map this error to the process exit code it implies.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Interrupted => ExitCode::Interrupted,
            _ => ExitCode::FatalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::FatalError.as_i32(), 1);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn test_fatal_error_display() {
        let err = FatalError::RootNotFound(PathBuf::from("/missing"));
        assert_eq!(err.to_string(), "Path not found: /missing");

        let err = FatalError::RootNotDirectory(PathBuf::from("/file.txt"));
        assert_eq!(err.to_string(), "Not a directory: /file.txt");
    }

    #[test]
    fn test_fatal_error_exit_codes() {
        assert_eq!(
            FatalError::RootNotFound(PathBuf::from("/x")).exit_code(),
            ExitCode::FatalError
        );
        assert_eq!(FatalError::Interrupted.exit_code(), ExitCode::Interrupted);
    }
}
