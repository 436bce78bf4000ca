//! Disk-backed size buckets for memory-efficient mode.
//!
//! During the walk, file entries are appended to an unlinked temporary
//! file as JSON lines; only a per-size index of byte ranges stays
//! resident. Buckets are read back one size at a time after the walk, so
//! peak memory tracks the largest single bucket instead of the whole
//! tree.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};

use crate::scanner::FileEntry;

/// Append-only spill writer used while the walk is running.
#[derive(Debug)]
pub(crate) struct SpillStore {
    writer: BufWriter<File>,
    index: BTreeMap<u64, Vec<(u64, u32)>>,
    offset: u64,
}

impl SpillStore {
    /// Create a store backed by an unlinked temporary file.
    pub(crate) fn new() -> io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(tempfile::tempfile()?),
            index: BTreeMap::new(),
            offset: 0,
        })
    }

    /// Append one entry under its size bucket.
    pub(crate) fn push(&mut self, entry: &FileEntry) -> io::Result<()> {
        let line = serde_json::to_vec(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(&line)?;
        self.writer.write_all(b"\n")?;

        self.index
            .entry(entry.size)
            .or_default()
            .push((self.offset, line.len() as u32));
        self.offset += line.len() as u64 + 1;
        Ok(())
    }

    /// Flush and switch to the read side.
    pub(crate) fn finish(self) -> io::Result<SpillReader> {
        let file = self
            .writer
            .into_inner()
            .map_err(io::IntoInnerError::into_error)?;
        Ok(SpillReader {
            file,
            index: self.index,
        })
    }
}

/// Read side of the spill store.
#[derive(Debug)]
pub(crate) struct SpillReader {
    file: File,
    index: BTreeMap<u64, Vec<(u64, u32)>>,
}

impl SpillReader {
    /// All sizes seen, ascending.
    pub(crate) fn sizes(&self) -> Vec<u64> {
        self.index.keys().copied().collect()
    }

    /// Number of entries recorded for one size.
    pub(crate) fn count(&self, size: u64) -> usize {
        self.index.get(&size).map_or(0, Vec::len)
    }

    /// Load one size bucket back into memory.
    pub(crate) fn take(&mut self, size: u64) -> io::Result<Vec<FileEntry>> {
        let Some(ranges) = self.index.remove(&size) else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::with_capacity(ranges.len());
        for (offset, len) in ranges {
            self.file.seek(SeekFrom::Start(offset))?;
            let mut buf = vec![0u8; len as usize];
            self.file.read_exact(&mut buf)?;
            let entry: FileEntry = serde_json::from_slice(&buf)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_spill_round_trip() {
        let mut store = SpillStore::new().unwrap();
        let a = FileEntry::new(PathBuf::from("/t/a.txt"), 10);
        let b = FileEntry::new(PathBuf::from("/t/b.txt"), 10);
        let c = FileEntry::new(PathBuf::from("/t/c.txt"), 20);
        store.push(&a).unwrap();
        store.push(&b).unwrap();
        store.push(&c).unwrap();

        let mut reader = store.finish().unwrap();
        assert_eq!(reader.sizes(), vec![10, 20]);
        assert_eq!(reader.count(10), 2);
        assert_eq!(reader.count(20), 1);

        assert_eq!(reader.take(10).unwrap(), vec![a, b]);
        assert_eq!(reader.take(20).unwrap(), vec![c]);
        // A size can only be taken once.
        assert!(reader.take(10).unwrap().is_empty());
    }

    #[test]
    fn test_spill_handles_odd_paths() {
        let mut store = SpillStore::new().unwrap();
        let entry = FileEntry::new(PathBuf::from("/t/with \"quotes\" and \n newline"), 7);
        store.push(&entry).unwrap();

        let mut reader = store.finish().unwrap();
        assert_eq!(reader.take(7).unwrap(), vec![entry]);
    }
}
