//! BLAKE3 file hashing with streaming reads.
//!
//! Two hashing modes back the detection pipeline:
//!
//! - **Prehash**: digest of the first [`PREHASH_SIZE`] bytes only. Cheap,
//!   used to reject same-sized files that differ early.
//! - **Full hash**: digest of the entire content, read in [`CHUNK_SIZE`]
//!   blocks so memory stays flat regardless of file size.
//!
//! The chunk size never affects the resulting digest; it only bounds the
//! read buffer. For files no larger than the prehash window, the prehash
//! covers the whole content and equals the full hash.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::HashError;

/// A 256-bit content digest.
pub type Hash = [u8; 32];

/// Default number of bytes hashed by [`Hasher::prehash`].
pub const PREHASH_SIZE: u64 = 4096;

/// Default read chunk for [`Hasher::full_hash`].
pub const CHUNK_SIZE: usize = 65536;

/// File hasher with configurable prehash window and read chunk.
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    partial_size: u64,
    chunk_size: usize,
}

impl Hasher {
    /// Create a hasher with explicit prehash window and chunk size.
    #[must_use]
    pub fn new(partial_size: u64, chunk_size: usize) -> Self {
        Self {
            partial_size: partial_size.max(1),
            chunk_size: chunk_size.max(512),
        }
    }

    /// Create a hasher with the default 4 KiB prehash and 64 KiB chunks.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(PREHASH_SIZE, CHUNK_SIZE)
    }

    /// The configured prehash window in bytes.
    #[must_use]
    pub fn partial_size(&self) -> u64 {
        self.partial_size
    }

    /// Hash the first `partial_size` bytes of the file.
    ///
    /// Reading fewer bytes than the window (EOF) is not an error; the
    /// digest covers whatever was read.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] if the file cannot be opened or read.
    pub fn prehash(&self, path: &Path) -> Result<Hash, HashError> {
        let file = open(path)?;
        let mut hasher = blake3::Hasher::new();
        let mut remaining = self.partial_size;
        let mut buf = vec![0u8; self.chunk_size.min(self.partial_size as usize)];

        let mut reader = file;
        while remaining > 0 {
            let want = buf.len().min(remaining as usize);
            let n = reader
                .read(&mut buf[..want])
                .map_err(|e| map_io(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            remaining -= n as u64;
        }

        Ok(*hasher.finalize().as_bytes())
    }

    /// Hash the entire file content, streamed in `chunk_size` reads.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let mut file = open(path)?;
        let mut hasher = blake3::Hasher::new();
        let mut buf = vec![0u8; self.chunk_size];

        loop {
            let n = file.read(&mut buf).map_err(|e| map_io(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        Ok(*hasher.finalize().as_bytes())
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Digest of zero-length content. All empty files share this hash.
#[must_use]
pub fn empty_hash() -> Hash {
    *blake3::hash(b"").as_bytes()
}

/// Convert a hash to its lowercase hexadecimal representation.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    let mut hex = String::with_capacity(64);
    for byte in hash {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Parse a 64-character hex string back into a hash.
///
/// Returns `None` if the input has the wrong length or contains
/// non-hex characters.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    if hex.len() != 64 {
        return None;
    }
    let mut hash = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let s = std::str::from_utf8(chunk).ok()?;
        hash[i] = u8::from_str_radix(s, 16).ok()?;
    }
    Some(hash)
}

fn open(path: &Path) -> Result<File, HashError> {
    File::open(path).map_err(|e| map_io(path, e))
}

fn map_io(path: &Path, error: std::io::Error) -> HashError {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::NotFound => HashError::Vanished(PathBuf::from(path)),
        ErrorKind::PermissionDenied => HashError::PermissionDenied(PathBuf::from(path)),
        _ => HashError::Io {
            path: PathBuf::from(path),
            source: error,
        },
    }
}
