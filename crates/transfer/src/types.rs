//! Core data types of the transfer engine.

use crate::error::PartError;

/// A contiguous byte range of a file, transferred independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePart {
    /// 0-based position in the plan.
    pub index: u32,
    /// First byte of the range.
    pub offset: i64,
    /// Range length in bytes.
    pub length: i64,
}

impl FilePart {
    /// First byte past the range.
    pub fn end(&self) -> i64 {
        self.offset + self.length
    }

    /// The range as an HTTP `Range` header value (inclusive end).
    pub fn http_range(&self) -> String {
        format!("bytes={}-{}", self.offset, self.end() - 1)
    }

    pub fn description(&self) -> String {
        format!("{} (bytes {}-{})", self.index, self.offset, self.end() - 1)
    }
}

/// Ordered, immutable set of parts covering one file exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    parts: Vec<FilePart>,
    file_size: i64,
    chunk_size: i64,
}

impl TransferPlan {
    pub(crate) fn new(parts: Vec<FilePart>, file_size: i64, chunk_size: i64) -> Self {
        debug_assert!(!parts.is_empty());
        debug_assert_eq!(parts.iter().map(|p| p.length).sum::<i64>(), file_size);
        Self {
            parts,
            file_size,
            chunk_size,
        }
    }

    /// A plan of exactly one part spanning the whole file.
    ///
    /// The canonical representation of an unsplittable transfer; it flows
    /// through the same dispatch path as a multipart plan and reports
    /// `chunk_size == file_size`.
    pub fn whole_file(file_size: i64) -> Self {
        Self {
            parts: vec![FilePart {
                index: 0,
                offset: 0,
                length: file_size,
            }],
            file_size,
            chunk_size: file_size,
        }
    }

    pub fn parts(&self) -> &[FilePart] {
        &self.parts
    }

    pub fn part_count(&self) -> u32 {
        self.parts.len() as u32
    }

    pub fn file_size(&self) -> i64 {
        self.file_size
    }

    pub fn chunk_size(&self) -> i64 {
        self.chunk_size
    }

    pub fn is_multipart(&self) -> bool {
        self.parts.len() > 1
    }
}

/// Result of the last attempt run for one part within a dispatch.
#[derive(Debug, Clone)]
pub struct PartOutcome {
    pub index: u32,
    /// Bytes credited to the transfer by this part; the full part length on
    /// success, 0 otherwise.
    pub bytes_transferred: i64,
    pub success: bool,
    pub error: Option<PartError>,
    /// Network attempts consumed, including the successful one.
    pub attempts: u32,
    /// Receipt returned by the store for an uploaded part.
    pub etag: Option<String>,
}

impl PartOutcome {
    pub fn succeeded(part: &FilePart, attempts: u32, etag: Option<String>) -> Self {
        Self {
            index: part.index,
            bytes_transferred: part.length,
            success: true,
            error: None,
            attempts,
            etag,
        }
    }

    pub fn failed(part: &FilePart, attempts: u32, error: PartError) -> Self {
        Self {
            index: part.index,
            bytes_transferred: 0,
            success: false,
            error: Some(error),
            attempts,
            etag: None,
        }
    }
}

/// A part index with the message of its last failure, for terminal reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartFailure {
    pub index: u32,
    pub error: String,
}
