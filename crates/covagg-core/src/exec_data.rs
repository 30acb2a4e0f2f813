//! In-memory coverage data accumulator.
//!
//! The binary coverage format itself is opaque here: a file is accepted when
//! its header announces a coverage data stream, and each accepted file is
//! recorded with its size and SHA-256 digest in load order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::aggregator::ExecutionDataLoader;
use crate::error::{CoverageError, CoverageResult};

/// Block type that opens every coverage data stream.
pub const BLOCK_HEADER: u8 = 0x01;

/// Magic number following the header block type (big endian).
pub const MAGIC_NUMBER: u16 = 0xC0C0;

/// One data file merged into the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedDataFile {
    pub path: PathBuf,
    pub size: u64,
    /// Hex-encoded SHA-256 of the file content.
    pub digest: String,
}

/// Session-wide accumulator fed by the aggregator's data phase.
#[derive(Debug, Clone, Default)]
pub struct ExecutionDataStore {
    files: Vec<LoadedDataFile>,
}

impl ExecutionDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files in load order.
    pub fn files(&self) -> &[LoadedDataFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Digest over the ordered file digests; equal for equal sessions.
    pub fn session_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for file in &self.files {
            hasher.update(file.digest.as_bytes());
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }
}

/// Reject content that does not start with a coverage data header.
///
/// An empty file is an empty session and passes.
fn check_header(path: &Path, bytes: &[u8]) -> CoverageResult<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    let [block, hi, lo, ..] = bytes else {
        return Err(CoverageError::DataFormat {
            path: path.to_path_buf(),
            detail: format!("truncated header ({} bytes)", bytes.len()),
        });
    };
    if *block != BLOCK_HEADER {
        return Err(CoverageError::DataFormat {
            path: path.to_path_buf(),
            detail: format!("unexpected block type 0x{block:02x}"),
        });
    }
    let magic = u16::from_be_bytes([*hi, *lo]);
    if magic != MAGIC_NUMBER {
        return Err(CoverageError::DataFormat {
            path: path.to_path_buf(),
            detail: format!("invalid magic number 0x{magic:04x}"),
        });
    }
    Ok(())
}

impl ExecutionDataLoader for ExecutionDataStore {
    fn load_execution_data(&mut self, path: &Path) -> CoverageResult<()> {
        let bytes = fs::read(path).map_err(|source| CoverageError::DataLoad {
            path: path.to_path_buf(),
            source,
        })?;
        check_header(path, &bytes)?;
        self.files.push(LoadedDataFile {
            path: path.to_path_buf(),
            size: bytes.len() as u64,
            digest: hex::encode(Sha256::digest(&bytes)),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_valid_header_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.exec", &[0x01, 0xC0, 0xC0, 0x10, 0x07]);
        let mut store = ExecutionDataStore::new();
        store.load_execution_data(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.files()[0].size, 5);
        assert_eq!(store.files()[0].digest.len(), 64);
        assert_eq!(store.total_bytes(), 5);
    }

    #[test]
    fn test_empty_file_is_an_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "empty.exec", &[]);
        let mut store = ExecutionDataStore::new();
        store.load_execution_data(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 0);
    }

    #[test]
    fn test_bad_magic_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "junk.exec", b"hello world");
        let mut store = ExecutionDataStore::new();
        let err = store.load_execution_data(&path).unwrap_err();
        assert!(matches!(err, CoverageError::DataFormat { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_truncated_header_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "short.exec", &[0x01, 0xC0]);
        let mut store = ExecutionDataStore::new();
        let err = store.load_execution_data(&path).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_missing_file_is_data_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ExecutionDataStore::new();
        let err = store
            .load_execution_data(&dir.path().join("gone.exec"))
            .unwrap_err();
        assert!(matches!(err, CoverageError::DataLoad { .. }));
    }

    #[test]
    fn test_session_digest_depends_on_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.exec", &[0x01, 0xC0, 0xC0, 0xAA]);
        let b = write(dir.path(), "b.exec", &[0x01, 0xC0, 0xC0, 0xBB]);

        let mut ab = ExecutionDataStore::new();
        ab.load_execution_data(&a).unwrap();
        ab.load_execution_data(&b).unwrap();
        let mut ab_again = ExecutionDataStore::new();
        ab_again.load_execution_data(&a).unwrap();
        ab_again.load_execution_data(&b).unwrap();
        let mut ba = ExecutionDataStore::new();
        ba.load_execution_data(&b).unwrap();
        ba.load_execution_data(&a).unwrap();

        assert_eq!(ab.session_digest(), ab_again.session_digest());
        assert_ne!(ab.session_digest(), ba.session_digest());
    }
}
