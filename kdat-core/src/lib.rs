//! # KDAT Core
//!
//! Core components for the KDAT archive workspace.
//!
//! This crate provides the fundamental building blocks shared by the codec
//! and container layers:
//!
//! - [`bitstream`]: MSB-first bit-level I/O over in-memory buffers
//! - [`profile`]: encoder-side compression parameters (window, lookahead)
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! The KDAT workspace is a layered stack:
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ kdat-cli      compress / decompress / info     │
//! ├────────────────────────────────────────────────┤
//! │ kdat-archive  .kdat container read/write       │
//! ├────────────────────────────────────────────────┤
//! │ kdat-codec    LZSS tokenizer + Huffman codec   │
//! ├────────────────────────────────────────────────┤
//! │ kdat-core     BitReader/BitWriter (this crate) │
//! └────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod error;
pub mod profile;

// Re-exports for convenience
pub use bitstream::{BitReader, BitWriter};
pub use error::{KdatError, Result};
pub use profile::{CompressionProfile, MIN_MATCH};
