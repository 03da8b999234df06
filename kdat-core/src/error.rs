//! Error types for KDAT operations.
//!
//! One error enum covers the whole workspace: I/O failures, container
//! validation errors, codec corruption, and path safety violations. There is
//! no partial recovery; the first error aborts the archive operation.

use std::io;
use thiserror::Error;

/// The main error type for KDAT operations.
#[derive(Debug, Error)]
pub enum KdatError {
    /// I/O error from the underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic number in the archive header.
    #[error("Invalid magic: expected \"KDAT\", found {found:02x?}")]
    InvalidMagic {
        /// Actual magic bytes found.
        found: Vec<u8>,
    },

    /// Archive was written by the incompatible version-01 layout.
    #[error("Archive version '01' is no longer supported; repack it with a current tool")]
    LegacyVersion,

    /// Archive version is not the pinned current format version.
    #[error("Unsupported archive version '{version:02}'")]
    UnsupportedVersion {
        /// The version read from the header.
        version: u32,
    },

    /// Invalid header contents (non-digit version bytes, malformed fields).
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// File count is zero or implausibly large.
    #[error("Implausible file count {count} (corrupted archive?)")]
    ImplausibleFileCount {
        /// The file count read from the header.
        count: u32,
    },

    /// Unexpected end of data.
    #[error("Unexpected end of data: expected {expected} more bytes")]
    UnexpectedEof {
        /// Number of bytes that were expected but not available.
        expected: usize,
    },

    /// Unknown per-file storage method flag.
    #[error("Unknown storage method flag {flag} for '{path}'")]
    UnknownMethod {
        /// The flag value read from the record.
        flag: u8,
        /// Record path, for the error report.
        path: String,
    },

    /// A RAW record whose stored size differs from its original size,
    /// or a COMPRESSED record that is not smaller than its original.
    #[error("Stored size {stored} violates the {method} invariant against original size {original} for '{path}'")]
    SizeInvariant {
        /// Record path.
        path: String,
        /// Method name ("raw" or "compressed").
        method: &'static str,
        /// Stored size from the record.
        stored: u64,
        /// Original size from the record.
        original: u64,
    },

    /// Corrupted data detected while decoding.
    #[error("Corrupted data: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Invalid back-reference offset in a match token.
    #[error("Invalid match offset {offset}: only {emitted} bytes emitted")]
    InvalidOffset {
        /// The offending offset.
        offset: u64,
        /// Bytes emitted so far at decode time.
        emitted: u64,
    },

    /// Decoded output does not match the declared original size.
    #[error("Decoded size {actual} does not match declared original size {expected}")]
    SizeMismatch {
        /// Declared original size.
        expected: u64,
        /// Actual decoded size.
        actual: u64,
    },

    /// Archive entry path escapes the extraction root.
    #[error("Path traversal detected in entry: {path}")]
    PathTraversal {
        /// The suspicious path.
        path: String,
    },

    /// Origin directory contains no regular files to compress.
    #[error("Origin folder '{path}' contains no files to compress")]
    NoFiles {
        /// The origin directory.
        path: String,
    },

    /// Value exceeded a format bound that legal parameters cannot reach.
    #[error("Overflow: {message}")]
    Overflow {
        /// Description of the overflow.
        message: String,
    },
}

/// Result type alias for KDAT operations.
pub type Result<T> = std::result::Result<T, KdatError>;

impl KdatError {
    /// Create an invalid magic error.
    pub fn invalid_magic(found: impl Into<Vec<u8>>) -> Self {
        Self::InvalidMagic {
            found: found.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(expected: usize) -> Self {
        Self::UnexpectedEof { expected }
    }

    /// Create a corrupted data error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Create an invalid offset error.
    pub fn invalid_offset(offset: u64, emitted: u64) -> Self {
        Self::InvalidOffset { offset, emitted }
    }

    /// Create a path traversal error.
    pub fn path_traversal(path: impl Into<String>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Create an overflow error.
    pub fn overflow(message: impl Into<String>) -> Self {
        Self::Overflow {
            message: message.into(),
        }
    }
}
