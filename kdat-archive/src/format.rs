//! The `.kdat` container wire format.
//!
//! ```text
//! Header:
//!   4 bytes  "KDAT"
//!   2 bytes  version digits, ASCII decimal ("02")
//!   4 bytes  u32 LE file count
//! Per-file record (file-count times):
//!   4 bytes  u32 LE path length
//!   N bytes  relative path, UTF-8, forward-slash separated
//!   1 byte   storage method (0 = raw, 1 = compressed)
//!   8 bytes  u64 LE original size
//!   8 bytes  u64 LE stored size
//!   S bytes  payload
//! ```
//!
//! All metadata is little-endian; only the Huffman bit stream inside a
//! compressed payload is big-endian within a byte.

use std::io::{self, Read, Write};

use kdat_codec::file::Storage;
use kdat_core::error::{KdatError, Result};

/// Archive magic bytes.
pub const MAGIC: [u8; 4] = *b"KDAT";

/// Current format version. The reader is pinned to exactly this version.
pub const VERSION: u32 = 2;

/// ASCII digits of [`VERSION`] as written to the header.
pub const VERSION_DIGITS: [u8; 2] = *b"02";

/// Largest plausible file count; anything above is treated as corruption.
pub const MAX_FILE_COUNT: u32 = 100_000;

/// Largest record path length the reader accepts.
pub const MAX_PATH_LEN: u32 = 4096;

/// Encoder-side cap on the recursive origin size (5 GiB).
pub const MAX_ORIGIN_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// The archive file extension, without the dot.
pub const EXTENSION: &str = "kdat";

fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            KdatError::unexpected_eof(buf.len())
        } else {
            KdatError::Io(err)
        }
    })
}

pub(crate) fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    read_exact_or_eof(reader, &mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u32_le<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact_or_eof(reader, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_u64_le<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    read_exact_or_eof(reader, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Write the fixed archive header.
pub fn write_header<W: Write>(writer: &mut W, file_count: u32) -> Result<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&VERSION_DIGITS)?;
    writer.write_all(&file_count.to_le_bytes())?;
    Ok(())
}

/// Read and validate the fixed archive header, returning the file count.
pub fn read_header<R: Read>(reader: &mut R) -> Result<u32> {
    let mut magic = [0u8; 4];
    read_exact_or_eof(reader, &mut magic)?;
    if magic != MAGIC {
        return Err(KdatError::invalid_magic(magic.to_vec()));
    }

    let mut digits = [0u8; 2];
    read_exact_or_eof(reader, &mut digits)?;
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(KdatError::invalid_header(format!(
            "non-digit version bytes {digits:02x?}"
        )));
    }
    let version = u32::from(digits[0] - b'0') * 10 + u32::from(digits[1] - b'0');
    if version == 1 {
        return Err(KdatError::LegacyVersion);
    }
    if version != VERSION {
        return Err(KdatError::UnsupportedVersion { version });
    }

    let file_count = read_u32_le(reader)?;
    if file_count == 0 || file_count > MAX_FILE_COUNT {
        return Err(KdatError::ImplausibleFileCount { count: file_count });
    }

    Ok(file_count)
}

/// One record's metadata, read or written ahead of its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMeta {
    /// Relative path, forward-slash separated.
    pub path: String,
    /// Storage method of the payload.
    pub storage: Storage,
    /// Original file size in bytes.
    pub original_size: u64,
    /// Stored payload size in bytes.
    pub stored_size: u64,
}

impl RecordMeta {
    /// Write the metadata fields, in wire order.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&(self.path.len() as u32).to_le_bytes())?;
        writer.write_all(self.path.as_bytes())?;
        writer.write_all(&[self.storage.flag()])?;
        writer.write_all(&self.original_size.to_le_bytes())?;
        writer.write_all(&self.stored_size.to_le_bytes())?;
        Ok(())
    }

    /// Read the metadata fields, in wire order.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let path_len = read_u32_le(reader)?;
        if path_len == 0 || path_len > MAX_PATH_LEN {
            return Err(KdatError::corrupted(format!(
                "implausible record path length {path_len}"
            )));
        }

        let mut path_bytes = vec![0u8; path_len as usize];
        read_exact_or_eof(reader, &mut path_bytes)?;
        let path = String::from_utf8(path_bytes)
            .map_err(|_| KdatError::corrupted("record path is not valid UTF-8"))?;

        let flag = read_u8(reader)?;
        let storage = Storage::from_flag(flag).ok_or(KdatError::UnknownMethod {
            flag,
            path: path.clone(),
        })?;

        let original_size = read_u64_le(reader)?;
        let stored_size = read_u64_le(reader)?;

        Ok(Self {
            path,
            storage,
            original_size,
            stored_size,
        })
    }

    /// Check the RAW / COMPRESSED size invariants.
    pub fn validate(&self) -> Result<()> {
        match self.storage {
            Storage::Raw if self.stored_size != self.original_size => {
                Err(KdatError::SizeInvariant {
                    path: self.path.clone(),
                    method: "raw",
                    stored: self.stored_size,
                    original: self.original_size,
                })
            }
            Storage::Compressed if self.stored_size >= self.original_size => {
                Err(KdatError::SizeInvariant {
                    path: self.path.clone(),
                    method: "compressed",
                    stored: self.stored_size,
                    original: self.original_size,
                })
            }
            _ => Ok(()),
        }
    }
}
