//! Progress reporting.
//!
//! The pipeline never talks to a terminal directly; it emits
//! [`ProgressEvent`]s to a [`ProgressSink`] threaded through the run.
//! Three sinks ship with the crate: [`NoopSink`] (JSON mode),
//! [`TerminalSink`] (indicatif bars), and [`CaptureSink`] for tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::duplicates::ScanSummary;

/// The discrete phases of a scan, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanPhase {
    /// Streaming the directory tree
    Walking,
    /// Bucketing files by size
    SizeGrouping,
    /// Hashing file prefixes
    Prehash,
    /// Hashing full contents
    FullHash,
    /// Rolling file groups up into folder groups
    FolderRollup,
}

impl ScanPhase {
    /// Human-readable phase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::SizeGrouping => "sizes",
            Self::Prehash => "prehash",
            Self::FullHash => "fullhash",
            Self::FolderRollup => "folders",
        }
    }
}

/// Lifecycle events emitted during a scan.
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    /// The scan started on the given root.
    Started {
        /// Root directory being scanned
        root: &'a Path,
    },
    /// The walker yielded a regular file.
    FileDiscovered {
        /// Path of the discovered file
        path: &'a Path,
        /// Its size in bytes
        size: u64,
    },
    /// A phase advanced. `total` may still grow while walking.
    StageProgress {
        /// Which phase advanced
        phase: ScanPhase,
        /// Items completed so far
        done: u64,
        /// Items expected in total
        total: u64,
    },
    /// The scan finished; the report is about to be returned.
    Finished {
        /// Final summary statistics
        stats: &'a ScanSummary,
    },
}

/// Receiver for scan lifecycle events.
///
/// Implementations must be cheap: events fire once per file discovered
/// and once per hash job completed, from multiple threads.
pub trait ProgressSink: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: ProgressEvent<'_>);
}

/// Sink that discards every event. Used for JSON and quiet modes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn on_event(&self, _event: ProgressEvent<'_>) {}
}

/// Terminal progress display using indicatif.
///
/// Shows a spinner while walking and a bar per hashing phase.
pub struct TerminalSink {
    multi: MultiProgress,
    bars: Mutex<HashMap<ScanPhase, ProgressBar>>,
}

impl TerminalSink {
    /// Create a new terminal sink drawing to stderr.
    #[must_use]
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn phase_message(phase: ScanPhase) -> &'static str {
        match phase {
            ScanPhase::Walking => "Scanning directory",
            ScanPhase::SizeGrouping => "Grouping by size",
            ScanPhase::Prehash => "Prehashing",
            ScanPhase::FullHash => "Full hashing",
            ScanPhase::FolderRollup => "Matching folders",
        }
    }

    fn bar_for(&self, phase: ScanPhase, total: u64) -> ProgressBar {
        let mut bars = self.bars.lock().unwrap();
        bars.entry(phase)
            .or_insert_with(|| {
                let pb = if phase == ScanPhase::Walking {
                    let pb = self.multi.add(ProgressBar::new_spinner());
                    pb.set_style(Self::spinner_style());
                    pb.enable_steady_tick(Duration::from_millis(100));
                    pb
                } else {
                    let pb = self.multi.add(ProgressBar::new(total));
                    pb.set_style(Self::bar_style());
                    pb
                };
                pb.set_message(Self::phase_message(phase));
                pb
            })
            .clone()
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalSink {
    fn on_event(&self, event: ProgressEvent<'_>) {
        match event {
            ProgressEvent::Started { .. } => {
                let _ = self.bar_for(ScanPhase::Walking, 0);
            }
            ProgressEvent::FileDiscovered { .. } => {
                self.bar_for(ScanPhase::Walking, 0).inc(1);
            }
            ProgressEvent::StageProgress { phase, done, total } => {
                let pb = self.bar_for(phase, total);
                if phase != ScanPhase::Walking {
                    pb.set_length(total);
                }
                pb.set_position(done);
                if done >= total && total > 0 {
                    pb.finish();
                }
            }
            ProgressEvent::Finished { .. } => {
                let bars = self.bars.lock().unwrap();
                for pb in bars.values() {
                    pb.finish_and_clear();
                }
            }
        }
    }
}

/// Owned copy of an event, for assertions in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedEvent {
    /// Scan started
    Started(PathBuf),
    /// File discovered with its size
    FileDiscovered(PathBuf, u64),
    /// Phase progress tick
    StageProgress(ScanPhase, u64, u64),
    /// Scan finished
    Finished,
}

/// Sink that records every event for later inspection.
#[derive(Debug, Default)]
pub struct CaptureSink {
    events: Mutex<Vec<CapturedEvent>>,
}

impl CaptureSink {
    /// Create an empty capture sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out all events captured so far.
    #[must_use]
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for CaptureSink {
    fn on_event(&self, event: ProgressEvent<'_>) {
        let owned = match event {
            ProgressEvent::Started { root } => CapturedEvent::Started(root.to_path_buf()),
            ProgressEvent::FileDiscovered { path, size } => {
                CapturedEvent::FileDiscovered(path.to_path_buf(), size)
            }
            ProgressEvent::StageProgress { phase, done, total } => {
                CapturedEvent::StageProgress(phase, done, total)
            }
            ProgressEvent::Finished { .. } => CapturedEvent::Finished,
        };
        self.events.lock().unwrap().push(owned);
    }
}
