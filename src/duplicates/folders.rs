//! Folder-level duplicate rollup.
//!
//! Rewrites file-level duplicate groups into folder groups wherever whole
//! subtrees match. Directory identity is a recursive structural digest:
//! a directory hashes the sorted sequence of `(name, kind, digest)` tuples
//! of its direct children, where a file child contributes its content hash
//! and a directory child contributes its own structural digest. Two
//! folders therefore match only when their recursive contents are
//! identical in both layout and bytes; equal file multisets laid out
//! differently do not collide.
//!
//! Files whose content hash is unknown (unique files, files that errored
//! during hashing) contribute a sentinel digest derived from their path,
//! so their parent directories can never accidentally match anything.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::report::{DuplicateGroup, FolderGroup};
use crate::scanner::{FileEntry, Hash};

#[derive(Debug, Default)]
struct DirNode {
    /// Direct child files: name → size
    files: BTreeMap<OsString, u64>,
    /// Direct child directories, by name
    subdirs: BTreeSet<OsString>,
}

/// The directory tree exactly as observed by the walker.
#[derive(Debug)]
pub(crate) struct DirTree {
    root: PathBuf,
    nodes: HashMap<PathBuf, DirNode>,
}

impl DirTree {
    pub(crate) fn new(root: &Path) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(root.to_path_buf(), DirNode::default());
        Self {
            root: root.to_path_buf(),
            nodes,
        }
    }

    /// Register a walked directory, linking it into its ancestor chain.
    pub(crate) fn add_dir(&mut self, path: &Path) {
        self.nodes.entry(path.to_path_buf()).or_default();
        self.link_to_ancestors(path);
    }

    /// Register a walked file under its parent directory.
    pub(crate) fn add_file(&mut self, path: &Path, size: u64) {
        let Some(parent) = path.parent() else {
            return;
        };
        let Some(name) = path.file_name() else {
            return;
        };
        self.nodes
            .entry(parent.to_path_buf())
            .or_default()
            .files
            .insert(name.to_os_string(), size);
        self.link_to_ancestors(parent);
    }

    fn link_to_ancestors(&mut self, path: &Path) {
        let mut current = path.to_path_buf();
        while current != self.root {
            let Some(parent) = current.parent().map(Path::to_path_buf) else {
                break;
            };
            let Some(name) = current.file_name().map(OsString::from) else {
                break;
            };
            let node = self.nodes.entry(parent.clone()).or_default();
            if !node.subdirs.insert(name) {
                break; // chain above is already linked
            }
            current = parent;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DirInfo {
    digest: Hash,
    file_count: u64,
    total_bytes: u64,
}

/// What the rollup hands back to the pipeline.
#[derive(Debug)]
pub(crate) struct RollupResult {
    /// Folder groups retained after containment filtering
    pub folder_groups: Vec<FolderGroup>,
    /// File groups with covered paths removed
    pub file_groups: Vec<DuplicateGroup>,
    /// Lone survivors of filtered file groups, now unique
    pub displaced_unique: Vec<FileEntry>,
}

/// Collapse duplicate files that form duplicate subtrees into folder groups.
pub(crate) fn rollup(
    tree: &DirTree,
    file_digests: &HashMap<PathBuf, Hash>,
    file_groups: Vec<DuplicateGroup>,
) -> RollupResult {
    let infos = compute_digests(tree, file_digests);

    // Group non-empty directories by digest.
    let mut by_digest: BTreeMap<Hash, Vec<PathBuf>> = BTreeMap::new();
    let mut ordered: Vec<&PathBuf> = tree.nodes.keys().collect();
    ordered.sort();
    for path in ordered {
        if *path == tree.root {
            continue;
        }
        let info = &infos[path.as_path()];
        if info.file_count > 0 {
            by_digest.entry(info.digest).or_default().push(path.clone());
        }
    }

    // Within each group, keep only members that are not descendants of
    // another member of the same group.
    let mut candidates: Vec<(Hash, Vec<PathBuf>)> = Vec::new();
    for (digest, mut members) in by_digest {
        if members.len() < 2 {
            continue;
        }
        members.sort();
        let mut kept: Vec<PathBuf> = Vec::with_capacity(members.len());
        for member in members {
            if !kept.iter().any(|k| member.starts_with(k) && member != *k) {
                kept.push(member);
            }
        }
        if kept.len() >= 2 {
            candidates.push((digest, kept));
        }
    }

    // Across groups, drop a group only when every one of its members lies
    // beneath an already-reported folder; a group with any uncovered
    // member is kept whole. Shallow groups are decided first so ancestors
    // always report before the subtrees they cover.
    candidates.sort_by_key(|(_, members)| {
        let depth = members
            .iter()
            .map(|m| m.components().count())
            .min()
            .unwrap_or(0);
        (depth, members[0].clone())
    });

    let mut reported: Vec<PathBuf> = Vec::new();
    let mut folder_groups: Vec<FolderGroup> = Vec::new();
    for (digest, members) in candidates {
        let covered = members
            .iter()
            .all(|m| reported.iter().any(|r| m.starts_with(r) && m != r));
        if covered {
            log::debug!(
                "Suppressing folder group under reported ancestors: {:?}",
                members
            );
            continue;
        }
        let info = &infos[members[0].as_path()];
        reported.extend(members.iter().cloned());
        folder_groups.push(FolderGroup {
            digest,
            dirs: members,
            file_count: info.file_count,
            total_bytes: info.total_bytes,
        });
    }

    folder_groups.sort_by(|a, b| {
        b.total_bytes
            .cmp(&a.total_bytes)
            .then_with(|| a.dirs[0].cmp(&b.dirs[0]))
    });

    // Suppress file paths beneath any reported folder from the file
    // groups; a group left with a single survivor collapses to unique.
    let mut filtered_groups = Vec::with_capacity(file_groups.len());
    let mut displaced_unique = Vec::new();
    for mut group in file_groups {
        group
            .files
            .retain(|f| !reported.iter().any(|r| f.starts_with(r) && f != r));
        match group.files.len() {
            0 => {}
            1 => {
                let path = group.files.pop().expect("one survivor");
                displaced_unique.push(FileEntry::new(path, group.size));
            }
            _ => filtered_groups.push(group),
        }
    }

    RollupResult {
        folder_groups,
        file_groups: filtered_groups,
        displaced_unique,
    }
}

/// Compute structural digests and aggregates for every directory,
/// bottom-up.
fn compute_digests(
    tree: &DirTree,
    file_digests: &HashMap<PathBuf, Hash>,
) -> HashMap<PathBuf, DirInfo> {
    let mut order: Vec<&PathBuf> = tree.nodes.keys().collect();
    // Deepest first, so child digests exist before their parents need them.
    order.sort_by_key(|p| (std::cmp::Reverse(p.components().count()), (*p).clone()));

    let mut infos: HashMap<PathBuf, DirInfo> = HashMap::with_capacity(tree.nodes.len());
    for path in order {
        let node = &tree.nodes[path];
        let mut file_count = node.files.len() as u64;
        let mut total_bytes: u64 = node.files.values().sum();

        // Merge files and subdirectories into one name-sorted child list.
        let mut children: Vec<(&OsString, u8, Hash)> = Vec::new();
        for (name, _size) in &node.files {
            let child_path = path.join(name);
            let digest = file_digests
                .get(&child_path)
                .copied()
                .unwrap_or_else(|| path_sentinel(&child_path));
            children.push((name, 0u8, digest));
        }
        for name in &node.subdirs {
            let child_path = path.join(name);
            let child = infos
                .get(&child_path)
                .copied()
                .unwrap_or_else(|| empty_dir_info(&child_path));
            file_count += child.file_count;
            total_bytes += child.total_bytes;
            children.push((name, 1u8, child.digest));
        }
        children.sort_by(|a, b| a.0.cmp(b.0));

        let mut hasher = blake3::Hasher::new();
        for (name, kind, digest) in children {
            hasher.update(name.as_encoded_bytes());
            hasher.update(&[0u8, kind]);
            hasher.update(&digest);
        }

        infos.insert(
            path.clone(),
            DirInfo {
                digest: *hasher.finalize().as_bytes(),
                file_count,
                total_bytes,
            },
        );
    }

    infos
}

/// Digest for a directory with no computed info. Only reachable for
/// subdirectory names whose nodes were never registered, which the
/// ancestor linking prevents; kept as a safe fallback.
fn empty_dir_info(path: &Path) -> DirInfo {
    DirInfo {
        digest: path_sentinel(path),
        file_count: 0,
        total_bytes: 0,
    }
}

/// Unique per-path digest for content that has no known hash.
fn path_sentinel(path: &Path) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"\x00unhashed\x00");
    hasher.update(path.as_os_str().as_encoded_bytes());
    *hasher.finalize().as_bytes()
}
