//! End-to-end pipeline tests over real temporary trees.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dupescan::duplicates::{DuplicateFinder, FinderConfig, Report};
use dupescan::error::FatalError;
use dupescan::output::JsonOutput;
use dupescan::progress::{CaptureSink, CapturedEvent, ProgressSink, ScanPhase};
use tempfile::TempDir;

fn write_file(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(&path).unwrap().write_all(content).unwrap();
    path
}

fn scan(root: &Path) -> Report {
    DuplicateFinder::with_defaults()
        .find_duplicates(root)
        .unwrap()
}

fn scan_with(root: &Path, config: FinderConfig) -> Report {
    DuplicateFinder::new(config).find_duplicates(root).unwrap()
}

fn group_names(report: &Report) -> Vec<Vec<String>> {
    report
        .duplicate_files
        .iter()
        .map(|g| {
            g.files
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        })
        .collect()
}

#[test]
fn test_two_identical_one_different() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"hello");
    write_file(dir.path(), "b.txt", b"hello");
    write_file(dir.path(), "c.txt", b"world");

    let report = scan(dir.path());

    assert_eq!(report.duplicate_files.len(), 1);
    assert_eq!(group_names(&report), vec![vec!["a.txt", "b.txt"]]);
    assert!(report.duplicate_folders.is_empty());
    assert_eq!(report.unique_files.len(), 1);
    assert_eq!(
        report.unique_files[0].path.file_name().unwrap(),
        "c.txt"
    );
}

#[test]
fn test_three_copies_across_subdir_no_folder_group() {
    let dir = TempDir::new().unwrap();
    let content = b"XXXXXXXXXXXXXXXXXXXXXXXX"; // 24 bytes
    write_file(dir.path(), "dup1.txt", content);
    write_file(dir.path(), "dup2.txt", content);
    write_file(dir.path(), "sub/dup3.txt", content);

    let report = scan(dir.path());

    assert_eq!(report.duplicate_files.len(), 1);
    assert_eq!(report.duplicate_files[0].len(), 3);
    assert!(report.duplicate_folders.is_empty());
    assert!(report.unique_files.is_empty());
}

#[test]
fn test_identical_folders_roll_up() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "A/f.txt", b"hi");
    write_file(dir.path(), "A/g.txt", b"bye");
    write_file(dir.path(), "B/f.txt", b"hi");
    write_file(dir.path(), "B/g.txt", b"bye");

    let report = scan(dir.path());

    assert!(
        report.duplicate_files.is_empty(),
        "file groups under matched folders must be suppressed"
    );
    assert_eq!(report.duplicate_folders.len(), 1);
    let group = &report.duplicate_folders[0];
    let names: Vec<_> = group
        .dirs
        .iter()
        .map(|d| d.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(group.file_count, 2);
    assert!(report.unique_files.is_empty());
}

/// Deterministic pseudo-random bytes, distinct per seed.
fn noise(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u8
        })
        .collect()
}

#[test]
fn test_large_files_prehash_rejects_early() {
    let dir = TempDir::new().unwrap();
    let two_mib = 2 * 1024 * 1024;
    let r = noise(1, two_mib);
    let r_prime = noise(2, two_mib);
    write_file(dir.path(), "big1.bin", &r);
    write_file(dir.path(), "sub/big2.bin", &r);
    write_file(dir.path(), "big3.bin", &r_prime);

    let sink = Arc::new(CaptureSink::new());
    let config = FinderConfig::default()
        .with_progress(Arc::clone(&sink) as Arc<dyn ProgressSink>);
    let report = scan_with(dir.path(), config);

    assert_eq!(report.duplicate_files.len(), 1);
    assert_eq!(report.duplicate_files[0].len(), 2);
    assert_eq!(report.unique_files.len(), 1);
    assert_eq!(
        report.unique_files[0].path.file_name().unwrap(),
        "big3.bin"
    );

    // big3 differs within the first 4 KiB, so only the two copies reach
    // the full-hash stage.
    let fullhash_total = sink
        .events()
        .iter()
        .filter_map(|e| match e {
            CapturedEvent::StageProgress(ScanPhase::FullHash, _, total) => Some(*total),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    assert_eq!(fullhash_total, 2);
}

#[test]
fn test_small_same_size_files_skip_full_hash() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "sameprefix1.txt",
        b"Same beginning but different ending A",
    );
    write_file(
        dir.path(),
        "sameprefix2.txt",
        b"Same beginning but different ending B",
    );

    let sink = Arc::new(CaptureSink::new());
    let config = FinderConfig::default()
        .with_progress(Arc::clone(&sink) as Arc<dyn ProgressSink>);
    let report = scan_with(dir.path(), config);

    assert!(report.duplicate_files.is_empty());
    assert_eq!(report.unique_files.len(), 2);

    // Both files fit inside the prehash window, so the full-hash stage
    // never sees a job.
    assert!(!sink.events().iter().any(|e| matches!(
        e,
        CapturedEvent::StageProgress(ScanPhase::FullHash, _, total) if *total > 0
    )));
}

#[test]
fn test_zero_byte_files_pool_into_one_group() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "zero1", b"");
    write_file(dir.path(), "zero2", b"");
    write_file(dir.path(), "zero3", b"");

    let report = scan(dir.path());

    assert_eq!(report.duplicate_files.len(), 1);
    assert_eq!(report.duplicate_files[0].len(), 3);
    assert_eq!(report.duplicate_files[0].size, 0);
    assert!(report.unique_files.is_empty());
}

#[test]
fn test_lone_zero_byte_file_is_unique() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "zero", b"");
    write_file(dir.path(), "other.txt", b"content");

    let report = scan(dir.path());

    assert!(report.duplicate_files.is_empty());
    assert_eq!(report.unique_files.len(), 2);
}

#[test]
fn test_reports_are_byte_identical_across_runs() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"hello");
    write_file(dir.path(), "z/b.txt", b"hello");
    write_file(dir.path(), "z/c.txt", b"other");
    write_file(dir.path(), "m/d.txt", b"hello");
    write_file(dir.path(), "unique.bin", &noise(7, 10_000));

    let first = JsonOutput::new(&scan(dir.path()));
    let second = JsonOutput::new(&scan(dir.path()));

    // Durations differ run to run; everything else must not.
    let strip = |o: &JsonOutput| {
        let mut v: serde_json::Value =
            serde_json::from_str(&o.to_json().unwrap()).unwrap();
        let stats = v["statistics"].as_object_mut().unwrap();
        stats.retain(|k, _| !k.ends_with("_ms"));
        v
    };
    assert_eq!(strip(&first), strip(&second));
}

#[test]
fn test_rename_preserves_group_digest() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "one.txt", b"same content here");
    write_file(dir.path(), "two.txt", b"same content here");

    let before = scan(dir.path());
    let digest_before = before.duplicate_files[0].hash;

    fs::rename(dir.path().join("one.txt"), dir.path().join("renamed.txt")).unwrap();
    let after = scan(dir.path());

    assert_eq!(after.duplicate_files.len(), 1);
    assert_eq!(after.duplicate_files[0].hash, digest_before);
}

#[test]
fn test_duplicating_a_unique_file_creates_a_group() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "original.txt", b"once unique");

    let before = scan(dir.path());
    assert_eq!(before.unique_files.len(), 1);
    assert!(before.duplicate_files.is_empty());

    fs::copy(
        dir.path().join("original.txt"),
        dir.path().join("copy.txt"),
    )
    .unwrap();
    let after = scan(dir.path());

    assert_eq!(after.duplicate_files.len(), 1);
    assert_eq!(after.duplicate_files[0].len(), 2);
    assert!(after.unique_files.is_empty());
}

#[test]
fn test_memory_efficient_and_batched_runs_match_default() {
    let dir = TempDir::new().unwrap();
    for i in 0..8 {
        write_file(dir.path(), &format!("dup{i}.bin"), &noise(42, 9000));
    }
    write_file(dir.path(), "odd.bin", &noise(43, 9000));
    write_file(dir.path(), "small1.txt", b"tiny");
    write_file(dir.path(), "small2.txt", b"tiny");
    write_file(dir.path(), "A/x.txt", b"folderdup");
    write_file(dir.path(), "B/x.txt", b"folderdup");

    let render = |report: &Report| {
        let mut v: serde_json::Value =
            serde_json::from_str(&JsonOutput::new(report).to_json().unwrap()).unwrap();
        let stats = v["statistics"].as_object_mut().unwrap();
        stats.retain(|k, _| !k.ends_with("_ms"));
        v
    };

    let default_run = render(&scan_with(
        dir.path(),
        FinderConfig::default().with_workers(Some(4)),
    ));
    let spill_run = render(&scan_with(
        dir.path(),
        FinderConfig::default()
            .with_workers(Some(4))
            .with_memory_efficient(true),
    ));
    let batched_run = render(&scan_with(
        dir.path(),
        FinderConfig::default()
            .with_workers(Some(4))
            .with_batch_size(3),
    ));
    let single_worker_run = render(&scan_with(
        dir.path(),
        FinderConfig::default().with_workers(Some(1)),
    ));

    assert_eq!(default_run, spill_run);
    assert_eq!(default_run, batched_run);
    // Worker count lands in the stats; mask it before comparing.
    let mask = |mut v: serde_json::Value| {
        v["statistics"]["workers"] = 0.into();
        v
    };
    assert_eq!(mask(default_run), mask(single_worker_run));
}

#[test]
fn test_metadata_only_mode_groups_by_name_and_size() {
    let dir = TempDir::new().unwrap();
    // Same name and size, different bytes: metadata mode groups them.
    write_file(dir.path(), "a/report.pdf", b"AAAA");
    write_file(dir.path(), "b/report.pdf", b"BBBB");
    write_file(dir.path(), "notes.txt", b"something else");

    let report = scan_with(
        dir.path(),
        FinderConfig::default().with_metadata_only(true),
    );

    assert_eq!(report.summary.confidence.as_str(), "metadata_only");
    assert_eq!(report.duplicate_files.len(), 1);
    assert_eq!(report.duplicate_files[0].len(), 2);
    assert!(report.duplicate_folders.is_empty());
    assert_eq!(report.unique_files.len(), 1);

    // Content mode separates the same tree.
    let full = scan(dir.path());
    assert!(full.duplicate_files.is_empty());
    assert_eq!(full.unique_files.len(), 3);
}

#[test]
fn test_fatal_root_errors() {
    let missing = DuplicateFinder::with_defaults()
        .find_duplicates(Path::new("/definitely/not/here/42"));
    assert!(matches!(missing, Err(FatalError::RootNotFound(_))));

    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "plain.txt", b"x");
    let not_dir = DuplicateFinder::with_defaults().find_duplicates(&file);
    assert!(matches!(not_dir, Err(FatalError::RootNotDirectory(_))));
}

#[test]
fn test_cancellation_aborts_with_interrupted() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"data");

    let flag = Arc::new(AtomicBool::new(false));
    flag.store(true, Ordering::SeqCst);

    let finder = DuplicateFinder::new(
        FinderConfig::default().with_shutdown_flag(Arc::clone(&flag)),
    );
    let result = finder.find_duplicates(dir.path());
    assert!(matches!(result, Err(FatalError::Interrupted)));
}

#[test]
#[cfg(unix)]
fn test_broken_symlink_counted_once() {
    use dupescan::duplicates::WarningKind;

    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "real.txt", b"content");
    std::os::unix::fs::symlink(dir.path().join("gone.txt"), dir.path().join("dangling"))
        .unwrap();

    let report = scan(dir.path());

    assert_eq!(report.warnings, vec![(WarningKind::BrokenSymlink, 1)]);
    assert_eq!(report.summary.total_files, 1);
}

#[test]
fn test_progress_event_lifecycle() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"hello");
    write_file(dir.path(), "b.txt", b"hello");

    let sink = Arc::new(CaptureSink::new());
    let _report = scan_with(
        dir.path(),
        FinderConfig::default().with_progress(Arc::clone(&sink) as Arc<dyn ProgressSink>),
    );

    let events = sink.events();
    assert!(matches!(events.first(), Some(CapturedEvent::Started(_))));
    assert_eq!(events.last(), Some(&CapturedEvent::Finished));

    let discovered = events
        .iter()
        .filter(|e| matches!(e, CapturedEvent::FileDiscovered(_, _)))
        .count();
    assert_eq!(discovered, 2);

    // Both prehash jobs report completion.
    assert!(events
        .iter()
        .any(|e| *e == CapturedEvent::StageProgress(ScanPhase::Prehash, 2, 2)));
}

#[test]
fn test_summary_statistics_add_up() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"hello");
    write_file(dir.path(), "b.txt", b"hello");
    write_file(dir.path(), "c.txt", b"worlds!");

    let report = scan(dir.path());
    let s = &report.summary;

    assert_eq!(s.total_files, 3);
    assert_eq!(s.total_bytes, 5 + 5 + 7);
    assert_eq!(s.duplicate_groups, 1);
    assert_eq!(s.duplicate_files, 2);
    assert_eq!(s.unique_files, 1);
    assert_eq!(s.reclaimable_bytes, 5);
    assert!(s.workers >= 1);
    assert!(!s.interrupted);
}
