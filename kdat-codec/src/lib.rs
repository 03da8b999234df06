//! # KDAT Codec
//!
//! The compression pipeline for KDAT archive payloads.
//!
//! A file is encoded in three stages:
//!
//! 1. [`lzss`]: a sliding-window match finder turns raw bytes into a token
//!    sequence of literals and (offset, length) back-references.
//! 2. [`huffman`]: three prefix codes are built over the token fields
//!    (literal bytes, match lengths, match offsets) and their frequency
//!    tables are serialised ahead of the bit stream.
//! 3. [`file`]: tokens are written as one raw flag bit plus Huffman codes,
//!    and the result is kept only if it is smaller than the input;
//!    otherwise the file is stored raw.
//!
//! Decoding mirrors this and validates every structural invariant; any
//! violation is reported as corruption.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod file;
pub mod huffman;
pub mod lzss;

// Re-exports
pub use file::{decode_file, encode_file, EncodedFile, Storage};
pub use huffman::{ByteFreqTable, Code, HuffmanTree, OffsetFreqTable};
pub use lzss::Token;
