//! The multi-stage duplicate detection pipeline.
//!
//! [`DuplicateFinder::find_duplicates`] drives the whole run: it streams
//! the walker, buckets files by size, pushes surviving candidates through
//! prehash and full-hash stages on the worker pool, rolls matching
//! subtrees up into folder groups, and assembles the final [`Report`].
//!
//! The pipeline reads no file that cannot possibly be a duplicate: a
//! unique size is rejected without any I/O, a unique prehash after one
//! 4 KiB read, and files no larger than the prehash window skip the full
//! pass entirely because the prehash already covers every byte.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::folders::{rollup, DirTree};
use super::pool::{HashJob, HashPool, JobKind, JobOutcome};
use super::report::{
    Confidence, DuplicateGroup, Report, ScanSummary, WarningCounters, WarningKind,
};
use super::spill::{SpillReader, SpillStore};
use super::FinderConfig;
use crate::error::FatalError;
use crate::progress::{ProgressEvent, ScanPhase};
use crate::scanner::{empty_hash, FileEntry, Hash, Hasher, WalkedItem, Walker, WalkerConfig};

/// Orchestrates the detection pipeline for one root directory.
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Run the full pipeline and produce a report.
    ///
    /// Per-entry failures (unreadable files, broken symlinks, files that
    /// vanish mid-run) are counted as warnings and never abort the run.
    ///
    /// # Errors
    ///
    /// Returns a [`FatalError`] when the root is missing, not a
    /// directory, or unreadable, or when the run is cancelled.
    pub fn find_duplicates(&self, root: &Path) -> Result<Report, FatalError> {
        let scan_start = Instant::now();
        let root = validate_root(root)?;
        let workers = self.resolved_workers(&root);
        let sink = Arc::clone(&self.config.progress);
        let cancel = self
            .config
            .shutdown_flag
            .clone()
            .unwrap_or_else(|| Arc::new(AtomicBool::new(false)));
        let warnings = WarningCounters::new();

        sink.on_event(ProgressEvent::Started { root: &root });
        log::info!("Scanning {} with {} workers", root.display(), workers);

        // Walk: stream files into size buckets and the directory tree.
        let walk_start = Instant::now();
        let walker = Walker::new(
            &root,
            WalkerConfig::default().with_patterns(self.config.ignore_patterns.clone()),
        )
        .with_shutdown_flag(Arc::clone(&cancel));

        let mut tree = DirTree::new(&root);
        let mut sink_buckets = BucketSink::new(self.config.memory_efficient)?;
        let mut total_files = 0usize;
        let mut total_bytes = 0u64;

        for item in walker.walk() {
            match item {
                Ok(WalkedItem::Dir(path)) => tree.add_dir(&path),
                Ok(WalkedItem::File(entry)) => {
                    sink.on_event(ProgressEvent::FileDiscovered {
                        path: &entry.path,
                        size: entry.size,
                    });
                    total_files += 1;
                    total_bytes += entry.size;
                    tree.add_file(&entry.path, entry.size);
                    sink_buckets.push(entry)?;
                }
                Err(e) => {
                    log::warn!("{}", e);
                    warnings.record(WarningKind::from(&e));
                }
            }
        }
        if cancel.load(Ordering::SeqCst) {
            return Err(FatalError::Interrupted);
        }
        sink.on_event(ProgressEvent::StageProgress {
            phase: ScanPhase::Walking,
            done: total_files as u64,
            total: total_files as u64,
        });
        let walk_duration = walk_start.elapsed();
        log::info!("Walk complete: {} files, {} bytes", total_files, total_bytes);

        let mut buckets = sink_buckets.finish()?;
        let mut summary = ScanSummary {
            total_files,
            total_bytes,
            workers,
            walk_duration,
            ..ScanSummary::default()
        };

        // Fast mode: group by (name, size) without reading content.
        if self.config.metadata_only {
            let (mut groups, mut unique) = metadata_groups(&mut buckets)?;
            sort_report_order(&mut groups, &mut unique);
            summary.confidence = Confidence::MetadataOnly;
            summary.size_duration = walk_start.elapsed() - walk_duration;
            return Ok(self.assemble(
                groups,
                Vec::new(),
                unique,
                summary,
                &warnings,
                &cancel,
                scan_start,
                &sink,
            ));
        }

        // Stage 1: sizes seen once are unique; zero-byte files pool into
        // a single trivially-identical group.
        let size_start = Instant::now();
        let mut unique: Vec<FileEntry> = Vec::new();
        let mut groups: Vec<DuplicateGroup> = Vec::new();

        let sizes = buckets.sizes();
        let bucket_count = sizes.len() as u64;
        let mut candidate_sizes: Vec<u64> = Vec::new();
        let mut prehash_total = 0u64;
        for &size in &sizes {
            if size == 0 {
                continue;
            }
            let n = buckets.count(size);
            if n >= 2 {
                candidate_sizes.push(size);
                prehash_total += n as u64;
            } else {
                unique.append(&mut buckets.take(size)?);
            }
        }

        let mut zero_files = buckets.take(0)?;
        if zero_files.len() >= 2 {
            let mut paths: Vec<PathBuf> = zero_files.into_iter().map(|e| e.path).collect();
            paths.sort();
            groups.push(DuplicateGroup::new(empty_hash(), 0, paths));
        } else {
            unique.append(&mut zero_files);
        }

        sink.on_event(ProgressEvent::StageProgress {
            phase: ScanPhase::SizeGrouping,
            done: bucket_count,
            total: bucket_count,
        });
        summary.size_duration = size_start.elapsed();
        log::debug!(
            "Size filter: {} buckets, {} files need content comparison",
            bucket_count,
            prehash_total
        );

        let hasher = Hasher::new(self.config.partial_size_bytes, self.config.chunk_size_bytes);
        let pool = HashPool::new(workers, hasher, Arc::clone(&cancel), Arc::clone(&sink));
        let batch = self.config.batch_size;

        // Stage 2: prehash every member of a surviving size bucket and
        // partition by (size, prehash).
        let prehash_start = Instant::now();
        pool.begin_stage(ScanPhase::Prehash, prehash_total);
        let mut partial_partitions: BTreeMap<(u64, Hash), Vec<FileEntry>> = BTreeMap::new();
        for &size in &candidate_sizes {
            let members = buckets.take(size)?;
            run_jobs(
                &pool,
                batch,
                members.into_iter().map(|entry| HashJob {
                    entry,
                    kind: JobKind::Prehash,
                }),
                |outcome: JobOutcome| match outcome.result {
                    Ok(hash) => {
                        let key = (outcome.entry.size, hash);
                        partial_partitions.entry(key).or_default().push(outcome.entry);
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        warnings.record(WarningKind::from(&e));
                    }
                },
            )?;
        }
        summary.prehash_duration = prehash_start.elapsed();

        // Partitions whose files fit inside the prehash window already
        // have their full digest; promote them without re-reading.
        let mut full_candidates: Vec<Vec<FileEntry>> = Vec::new();
        let mut fullhash_total = 0u64;
        for ((size, prehash), mut members) in partial_partitions {
            if members.len() < 2 {
                unique.append(&mut members);
            } else if size <= self.config.partial_size_bytes {
                let mut paths: Vec<PathBuf> = members.into_iter().map(|e| e.path).collect();
                paths.sort();
                groups.push(DuplicateGroup::new(prehash, size, paths));
            } else {
                fullhash_total += members.len() as u64;
                full_candidates.push(members);
            }
        }

        // Stage 3: full hash for everything still colliding.
        let fullhash_start = Instant::now();
        pool.begin_stage(ScanPhase::FullHash, fullhash_total);
        let mut full_partitions: BTreeMap<Hash, (u64, Vec<FileEntry>)> = BTreeMap::new();
        for members in full_candidates {
            run_jobs(
                &pool,
                batch,
                members.into_iter().map(|entry| HashJob {
                    entry,
                    kind: JobKind::Full,
                }),
                |outcome: JobOutcome| match outcome.result {
                    Ok(hash) => {
                        let slot = full_partitions
                            .entry(hash)
                            .or_insert_with(|| (outcome.entry.size, Vec::new()));
                        slot.1.push(outcome.entry);
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        warnings.record(WarningKind::from(&e));
                    }
                },
            )?;
        }
        for (hash, (size, mut members)) in full_partitions {
            if members.len() < 2 {
                unique.append(&mut members);
            } else {
                let mut paths: Vec<PathBuf> = members.into_iter().map(|e| e.path).collect();
                paths.sort();
                groups.push(DuplicateGroup::new(hash, size, paths));
            }
        }
        summary.fullhash_duration = fullhash_start.elapsed();
        drop(pool); // joins the workers

        if cancel.load(Ordering::SeqCst) {
            return Err(FatalError::Interrupted);
        }

        // Folder rollup: collapse file groups that form identical
        // subtrees into folder groups.
        let rollup_start = Instant::now();
        sink.on_event(ProgressEvent::StageProgress {
            phase: ScanPhase::FolderRollup,
            done: 0,
            total: 1,
        });
        let mut file_digests: HashMap<PathBuf, Hash> = HashMap::new();
        for group in &groups {
            for path in &group.files {
                file_digests.insert(path.clone(), group.hash);
            }
        }
        let rolled = rollup(&tree, &file_digests, groups);
        let mut groups = rolled.file_groups;
        let folder_groups = rolled.folder_groups;
        unique.extend(rolled.displaced_unique);
        sink.on_event(ProgressEvent::StageProgress {
            phase: ScanPhase::FolderRollup,
            done: 1,
            total: 1,
        });
        summary.rollup_duration = rollup_start.elapsed();

        sort_report_order(&mut groups, &mut unique);

        Ok(self.assemble(
            groups,
            folder_groups,
            unique,
            summary,
            &warnings,
            &cancel,
            scan_start,
            &sink,
        ))
    }

    /// Assemble the immutable report and emit the final event.
    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        groups: Vec<DuplicateGroup>,
        folder_groups: Vec<super::report::FolderGroup>,
        unique: Vec<FileEntry>,
        mut summary: ScanSummary,
        warnings: &WarningCounters,
        cancel: &Arc<AtomicBool>,
        scan_start: Instant,
        sink: &Arc<dyn crate::progress::ProgressSink>,
    ) -> Report {
        summary.duplicate_groups = groups.len();
        summary.duplicate_files = groups.iter().map(DuplicateGroup::len).sum();
        summary.folder_groups = folder_groups.len();
        summary.unique_files = unique.len();
        summary.reclaimable_bytes = groups.iter().map(DuplicateGroup::wasted_space).sum::<u64>()
            + folder_groups
                .iter()
                .map(super::report::FolderGroup::wasted_space)
                .sum::<u64>();
        summary.interrupted = cancel.load(Ordering::SeqCst);
        summary.scan_duration = scan_start.elapsed();

        sink.on_event(ProgressEvent::Finished { stats: &summary });

        Report {
            duplicate_files: groups,
            duplicate_folders: folder_groups,
            unique_files: unique,
            summary,
            warnings: warnings.snapshot(),
        }
    }

    /// Pick the worker count: explicit config wins, otherwise a
    /// heuristic from the CPU count and the disk behind the root.
    fn resolved_workers(&self, root: &Path) -> usize {
        if let Some(w) = self.config.workers {
            return w.max(1);
        }
        let cpus = num_cpus::get().max(1);
        let w = match detect_disk_kind(root) {
            DiskKind::Ssd => cpus * 2,
            DiskKind::Rotational => 2,
            DiskKind::Unknown => cpus.min(8),
        };
        log::debug!("Auto-selected {} hash workers ({} CPUs)", w, cpus);
        w
    }
}

/// Submit jobs to the pool and hand outcomes to `on_outcome`.
///
/// With a non-zero `batch_size`, submission pauses every `batch_size`
/// jobs until that wave's outcomes are collected, bounding how many
/// results buffer at once. Outcomes arrive in arbitrary order either
/// way.
fn run_jobs<I, F>(
    pool: &HashPool,
    batch_size: usize,
    jobs: I,
    mut on_outcome: F,
) -> Result<(), FatalError>
where
    I: IntoIterator<Item = HashJob>,
    F: FnMut(JobOutcome),
{
    let wave = if batch_size == 0 {
        usize::MAX
    } else {
        batch_size
    };

    let mut pending = 0usize;
    for job in jobs {
        pool.submit(job).map_err(|_| FatalError::Interrupted)?;
        pending += 1;
        if pending >= wave {
            collect(pool, pending, &mut on_outcome)?;
            pending = 0;
        }
    }
    collect(pool, pending, &mut on_outcome)?;

    if pool.is_cancelled() {
        return Err(FatalError::Interrupted);
    }
    Ok(())
}

fn collect<F>(pool: &HashPool, count: usize, on_outcome: &mut F) -> Result<(), FatalError>
where
    F: FnMut(JobOutcome),
{
    for _ in 0..count {
        let outcome = pool.recv().map_err(|_| FatalError::Interrupted)?;
        on_outcome(outcome);
    }
    Ok(())
}

/// Group every walked file by `(file name, size)` without reading content.
fn metadata_groups(
    buckets: &mut Buckets,
) -> Result<(Vec<DuplicateGroup>, Vec<FileEntry>), FatalError> {
    let mut by_key: BTreeMap<(std::ffi::OsString, u64), Vec<FileEntry>> = BTreeMap::new();
    for size in buckets.sizes() {
        for entry in buckets.take(size)? {
            let name = entry
                .path
                .file_name()
                .map(std::ffi::OsStr::to_os_string)
                .unwrap_or_default();
            by_key.entry((name, size)).or_default().push(entry);
        }
    }

    let mut groups = Vec::new();
    let mut unique = Vec::new();
    for ((name, size), mut members) in by_key {
        if members.len() < 2 {
            unique.append(&mut members);
            continue;
        }
        let mut paths: Vec<PathBuf> = members.into_iter().map(|e| e.path).collect();
        paths.sort();
        groups.push(DuplicateGroup::new(metadata_key_hash(&name, size), size, paths));
    }
    Ok((groups, unique))
}

/// Synthetic digest for a metadata-only group, derived from its key.
fn metadata_key_hash(name: &std::ffi::OsStr, size: u64) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"\x00metadata\x00");
    hasher.update(name.as_encoded_bytes());
    hasher.update(&size.to_le_bytes());
    *hasher.finalize().as_bytes()
}

/// Stable report ordering: members lexicographic, groups by descending
/// size then first member, uniques by path.
fn sort_report_order(groups: &mut [DuplicateGroup], unique: &mut [FileEntry]) {
    for group in groups.iter_mut() {
        group.files.sort();
    }
    groups.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.files[0].cmp(&b.files[0]))
    });
    unique.sort_by(|a, b| a.path.cmp(&b.path));
}

fn validate_root(path: &Path) -> Result<PathBuf, FatalError> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FatalError::RootNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(FatalError::RootUnreadable {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    if !metadata.is_dir() {
        return Err(FatalError::RootNotDirectory(path.to_path_buf()));
    }
    let canonical = fs::canonicalize(path).map_err(|e| FatalError::RootUnreadable {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::read_dir(&canonical).map_err(|e| FatalError::RootUnreadable {
        path: canonical.clone(),
        source: e,
    })?;
    Ok(canonical)
}

/// Size buckets being filled during the walk.
enum BucketSink {
    Memory(BTreeMap<u64, Vec<FileEntry>>),
    Disk(SpillStore),
}

impl BucketSink {
    fn new(memory_efficient: bool) -> Result<Self, FatalError> {
        if memory_efficient {
            Ok(Self::Disk(SpillStore::new().map_err(FatalError::Scratch)?))
        } else {
            Ok(Self::Memory(BTreeMap::new()))
        }
    }

    fn push(&mut self, entry: FileEntry) -> Result<(), FatalError> {
        match self {
            Self::Memory(map) => {
                map.entry(entry.size).or_default().push(entry);
                Ok(())
            }
            Self::Disk(store) => store.push(&entry).map_err(FatalError::Scratch),
        }
    }

    fn finish(self) -> Result<Buckets, FatalError> {
        match self {
            Self::Memory(map) => Ok(Buckets::Memory(map)),
            Self::Disk(store) => Ok(Buckets::Disk(
                store.finish().map_err(FatalError::Scratch)?,
            )),
        }
    }
}

/// Size buckets after the walk, readable one size at a time.
enum Buckets {
    Memory(BTreeMap<u64, Vec<FileEntry>>),
    Disk(SpillReader),
}

impl Buckets {
    fn sizes(&self) -> Vec<u64> {
        match self {
            Self::Memory(map) => map.keys().copied().collect(),
            Self::Disk(reader) => reader.sizes(),
        }
    }

    fn count(&self, size: u64) -> usize {
        match self {
            Self::Memory(map) => map.get(&size).map_or(0, Vec::len),
            Self::Disk(reader) => reader.count(size),
        }
    }

    fn take(&mut self, size: u64) -> Result<Vec<FileEntry>, FatalError> {
        match self {
            Self::Memory(map) => Ok(map.remove(&size).unwrap_or_default()),
            Self::Disk(reader) => reader.take(size).map_err(FatalError::Scratch),
        }
    }
}

/// What kind of disk backs the scan root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiskKind {
    Ssd,
    Rotational,
    Unknown,
}

#[cfg(target_os = "linux")]
fn detect_disk_kind(root: &Path) -> DiskKind {
    use std::os::unix::fs::MetadataExt;

    let Ok(metadata) = fs::metadata(root) else {
        return DiskKind::Unknown;
    };
    let dev = metadata.dev();
    let major = (dev >> 8) & 0xfff;
    let minor = (dev & 0xff) | ((dev >> 12) & 0xffff00);

    // Partition device nodes keep the rotational flag on their parent.
    for candidate in [
        format!("/sys/dev/block/{major}:{minor}/queue/rotational"),
        format!("/sys/dev/block/{major}:{minor}/../queue/rotational"),
    ] {
        if let Ok(flag) = fs::read_to_string(&candidate) {
            return if flag.trim() == "1" {
                DiskKind::Rotational
            } else {
                DiskKind::Ssd
            };
        }
    }
    DiskKind::Unknown
}

#[cfg(not(target_os = "linux"))]
fn detect_disk_kind(_root: &Path) -> DiskKind {
    DiskKind::Unknown
}
