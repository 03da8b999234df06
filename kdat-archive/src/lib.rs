//! # KDAT Archive
//!
//! The `.kdat` container: a fixed header (`KDAT` magic, two ASCII version
//! digits, a file count) followed by one record per regular file, each
//! carrying its relative path, storage method, sizes, and payload.
//!
//! Compression walks the origin tree once in a stable sorted order and
//! writes records sequentially; expansion validates each record (method
//! flag, size invariants, path safety) before decoding and writing it.
//! Any failure aborts the whole operation.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod format;
pub mod reader;
pub mod writer;

// Re-exports
pub use format::{RecordMeta, EXTENSION, MAGIC, MAX_FILE_COUNT, MAX_ORIGIN_BYTES, VERSION};
pub use kdat_codec::file::Storage;
pub use reader::{decompress_archive, read_archive_index};
pub use writer::{collect_files, compress_dir, origin_size, ArchiveStats};
