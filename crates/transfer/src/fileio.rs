//! Positioned part I/O against the local file.
//!
//! Readers and writers are cheap path handles, not open files: every call
//! opens, positions, and closes. That makes part reads repeatable (a
//! retried part rereads the same bytes from the same offset) and lets
//! workers on disjoint ranges run without sharing a file handle.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::types::{FilePart, TransferPlan};

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// PartReader
// ---------------------------------------------------------------------------

/// Reads exact part ranges from a source file, re-opening per call.
#[derive(Debug, Clone)]
pub struct PartReader {
    path: PathBuf,
}

impl PartReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_size(&self) -> std::io::Result<i64> {
        Ok(std::fs::metadata(&self.path)?.len() as i64)
    }

    /// Reads exactly `part.length` bytes starting at `part.offset`.
    ///
    /// A short file is an error, never a short read.
    pub fn read_part(&self, part: &FilePart) -> std::io::Result<Vec<u8>> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(part.offset as u64))?;
        let mut buf = vec![0u8; part.length as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// SHA-256 hex digest of every part in the plan, in part order.
    pub fn part_digests(&self, plan: &TransferPlan) -> std::io::Result<Vec<String>> {
        plan.parts()
            .iter()
            .map(|part| Ok(digest_bytes(&self.read_part(part)?)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// PartWriter
// ---------------------------------------------------------------------------

/// Writes part ranges into a target file at exact offsets.
///
/// Parts may arrive in any order; byte-offset addressing assembles them
/// correctly regardless.
#[derive(Debug, Clone)]
pub struct PartWriter {
    path: PathBuf,
}

impl PartWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the target file (and parent directories) at its final size.
    pub fn prepare(&self, file_size: i64) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        file.set_len(file_size as u64)?;
        Ok(())
    }

    /// Writes `data` at `part.offset`.
    pub fn write_part(&self, part: &FilePart, data: &[u8]) -> std::io::Result<()> {
        debug_assert_eq!(data.len() as i64, part.length);
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(false)
            .open(&self.path)?;
        file.seek(SeekFrom::Start(part.offset as u64))?;
        file.write_all(data)?;
        Ok(())
    }
}
