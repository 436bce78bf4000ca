//! Edge cases: boundaries, containment, odd names, empty inputs.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use dupescan::duplicates::{DuplicateFinder, FinderConfig, Report};
use dupescan::scanner::PREHASH_SIZE;
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

#[test]
fn test_empty_root() {
    let dir = TempDir::new().unwrap();
    let report = scan(dir.path());

    assert!(report.duplicate_files.is_empty());
    assert!(report.duplicate_folders.is_empty());
    assert!(report.unique_files.is_empty());
    assert_eq!(report.summary.total_files, 0);
}

#[test]
fn test_file_at_prehash_boundary() {
    let dir = TempDir::new().unwrap();
    let window = PREHASH_SIZE as usize;

    let mut content = vec![b'x'; window];
    write_file(dir.path(), "boundary1.bin", &content);
    write_file(dir.path(), "boundary2.bin", &content);
    // Same size, differs only in the very last byte of the window.
    content[window - 1] = b'y';
    write_file(dir.path(), "boundary3.bin", &content);

    let report = scan(dir.path());

    assert_eq!(report.duplicate_files.len(), 1);
    assert_eq!(report.duplicate_files[0].len(), 2);
    assert_eq!(report.duplicate_files[0].size, PREHASH_SIZE);
    assert_eq!(report.unique_files.len(), 1);
}

#[test]
fn test_differs_only_past_prehash_window() {
    let dir = TempDir::new().unwrap();
    let len = PREHASH_SIZE as usize + 1000;

    let mut content = vec![b'a'; len];
    write_file(dir.path(), "tail1.bin", &content);
    write_file(dir.path(), "tail2.bin", &content);
    // Identical prefix, divergence after the window: only the full pass
    // can separate this one.
    content[len - 1] = b'b';
    write_file(dir.path(), "tail3.bin", &content);

    let report = scan(dir.path());

    assert_eq!(report.duplicate_files.len(), 1);
    assert_eq!(report.duplicate_files[0].len(), 2);
    assert_eq!(report.unique_files.len(), 1);
    assert_eq!(
        report.unique_files[0].path.file_name().unwrap(),
        "tail3.bin"
    );
}

#[test]
fn test_equal_size_different_content_separated() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "one.dat", b"ABCD");
    write_file(dir.path(), "two.dat", b"WXYZ");

    let report = scan(dir.path());

    assert!(report.duplicate_files.is_empty());
    assert_eq!(report.unique_files.len(), 2);
}

#[test]
fn test_nested_duplicate_folders_report_only_the_top() {
    let dir = TempDir::new().unwrap();
    // A and B match completely, including their sub/ trees. Only the
    // top-level pair should be reported.
    write_file(dir.path(), "A/f.txt", b"f");
    write_file(dir.path(), "A/sub/g.txt", b"g");
    write_file(dir.path(), "B/f.txt", b"f");
    write_file(dir.path(), "B/sub/g.txt", b"g");

    let report = scan(dir.path());

    assert_eq!(report.duplicate_folders.len(), 1);
    let names: Vec<_> = report.duplicate_folders[0]
        .dirs
        .iter()
        .map(|d| d.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["A", "B"]);
    assert!(report.duplicate_files.is_empty());
}

#[test]
fn test_folder_group_with_partner_outside_reported_tree_survives() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "A/f.txt", b"f");
    write_file(dir.path(), "A/sub/g.txt", b"g");
    write_file(dir.path(), "B/f.txt", b"f");
    write_file(dir.path(), "B/sub/g.txt", b"g");
    // Z matches A/sub and B/sub but sits outside any reported folder.
    write_file(dir.path(), "Z/g.txt", b"g");

    let report = scan(dir.path());

    assert_eq!(report.duplicate_folders.len(), 2);
    let sub_group = report
        .duplicate_folders
        .iter()
        .find(|g| g.dirs.iter().any(|d| d.ends_with("Z")))
        .expect("the sub/Z group must survive");
    assert_eq!(sub_group.len(), 3);
    // No loose file-level leftovers: everything sits under a reported
    // folder.
    assert!(report.duplicate_files.is_empty());
    assert!(report.unique_files.is_empty());
}

#[test]
fn test_subdirectory_layout_differences_prevent_folder_match() {
    let dir = TempDir::new().unwrap();
    // Identical file contents, different layout: files match, folders
    // must not.
    write_file(dir.path(), "A/f1.txt", b"f1");
    write_file(dir.path(), "A/deep/f2.txt", b"f2");
    write_file(dir.path(), "B/f1.txt", b"f1");
    write_file(dir.path(), "B/f2.txt", b"f2");

    let report = scan(dir.path());

    assert!(report.duplicate_folders.is_empty());
    assert_eq!(report.duplicate_files.len(), 2);
}

#[test]
fn test_special_characters_in_filenames() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "file with spaces.txt", b"content");
    write_file(dir.path(), "duplicate1.txt", b"content");
    write_file(dir.path(), "café_🦀.txt", b"unicode content");
    write_file(dir.path(), "duplicate2.txt", b"unicode content");

    let report = scan(dir.path());

    assert_eq!(report.duplicate_files.len(), 2);
    for group in &report.duplicate_files {
        assert_eq!(group.len(), 2);
    }
}

#[test]
fn test_ignore_patterns_exclude_files_from_detection() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "keep.txt", b"payload");
    write_file(dir.path(), "skip.tmp", b"payload");

    let finder = DuplicateFinder::new(
        FinderConfig::default().with_ignore_patterns(vec!["*.tmp".to_string()]),
    );
    let report = finder.find_duplicates(dir.path()).unwrap();

    assert!(report.duplicate_files.is_empty());
    assert_eq!(report.summary.total_files, 1);
}

#[test]
fn test_many_files_single_group() {
    let dir = TempDir::new().unwrap();
    for i in 0..50 {
        write_file(dir.path(), &format!("copy{i:02}.bin"), b"all the same bytes");
    }

    let report = scan(dir.path());

    assert_eq!(report.duplicate_files.len(), 1);
    assert_eq!(report.duplicate_files[0].len(), 50);
    // Members are sorted for stable output.
    let files = &report.duplicate_files[0].files;
    let mut sorted = files.clone();
    sorted.sort();
    assert_eq!(*files, sorted);
}

#[test]
fn test_group_ordering_largest_first() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "small1", b"ab");
    write_file(dir.path(), "small2", b"ab");
    let big = vec![0u8; 10_000];
    write_file(dir.path(), "big1", &big);
    write_file(dir.path(), "big2", &big);

    let report = scan(dir.path());

    assert_eq!(report.duplicate_files.len(), 2);
    assert_eq!(report.duplicate_files[0].size, 10_000);
    assert_eq!(report.duplicate_files[1].size, 2);
}

#[test]
fn test_hardlinked_files_report_as_duplicates() {
    // Hard links are ordinary duplicates here; there is no inode
    // awareness in the contract.
    #[cfg(unix)]
    {
        let dir = TempDir::new().unwrap();
        let original = write_file(dir.path(), "original.txt", b"linked content");
        fs::hard_link(&original, dir.path().join("hardlink.txt")).unwrap();

        let report = scan(dir.path());
        assert_eq!(report.duplicate_files.len(), 1);
        assert_eq!(report.duplicate_files[0].len(), 2);
    }
}
