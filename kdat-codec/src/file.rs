//! Per-file encode and decode.
//!
//! A compressed payload is three serialised frequency tables (literals,
//! lengths, offsets, in that order) followed by the token bit stream. Each
//! token is one raw flag bit (`1` literal, `0` match), then the literal's
//! code, or the offset's code followed by the length's code. Flags are
//! close to one bit of entropy, so they are packed raw rather than coded.
//!
//! The encoder keeps the compressed form only when it is strictly smaller
//! than the input; otherwise the file is stored raw. Empty files are always
//! raw.

use log::debug;

use kdat_core::bitstream::{BitReader, BitWriter};
use kdat_core::error::{KdatError, Result};
use kdat_core::profile::CompressionProfile;

use crate::huffman::{ByteCursor, ByteFreqTable, OffsetFreqTable};
use crate::lzss::{self, Token};

/// Per-file storage method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Payload is the original bytes, unchanged.
    Raw,
    /// Payload is tables + token bit stream.
    Compressed,
}

impl Storage {
    /// The wire flag for this method.
    pub fn flag(self) -> u8 {
        match self {
            Self::Raw => 0,
            Self::Compressed => 1,
        }
    }

    /// Parse a wire flag; anything but 0 or 1 is unknown.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Self::Raw),
            1 => Some(Self::Compressed),
            _ => None,
        }
    }
}

/// The result of encoding one file.
#[derive(Debug)]
pub struct EncodedFile {
    /// How the payload is stored.
    pub storage: Storage,
    /// Size of the original bytes.
    pub original_size: u64,
    /// The stored payload.
    pub payload: Vec<u8>,
}

impl EncodedFile {
    /// Size of the stored payload.
    pub fn stored_size(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// Encode one file's bytes.
pub fn encode_file(raw: &[u8], profile: &CompressionProfile) -> Result<EncodedFile> {
    if raw.is_empty() {
        return Ok(EncodedFile {
            storage: Storage::Raw,
            original_size: 0,
            payload: Vec::new(),
        });
    }

    let tokens = lzss::tokenize(raw, profile)?;

    let mut lit_freq = ByteFreqTable::new();
    let mut len_freq = ByteFreqTable::new();
    let mut off_freq = OffsetFreqTable::new();
    for token in &tokens {
        match *token {
            Token::Literal(byte) => lit_freq.record(byte),
            Token::Match { offset, length } => {
                off_freq.record(offset);
                len_freq.record(length);
            }
        }
    }

    let lit_codes = lit_freq.codes()?;
    let len_codes = len_freq.codes()?;
    let off_codes = off_freq.codes()?;

    let mut payload = Vec::new();
    lit_freq.write_to(&mut payload);
    len_freq.write_to(&mut payload);
    off_freq.write_to(&mut payload);

    let mut writer = BitWriter::new();
    for token in &tokens {
        match *token {
            Token::Literal(byte) => {
                writer.write_bit(true);
                let code = lit_codes
                    .get(&byte)
                    .ok_or_else(|| KdatError::corrupted("literal missing from code book"))?;
                writer.write_code(code.bits, code.len);
            }
            Token::Match { offset, length } => {
                writer.write_bit(false);
                let off_code = off_codes
                    .get(&offset)
                    .ok_or_else(|| KdatError::corrupted("offset missing from code book"))?;
                writer.write_code(off_code.bits, off_code.len);
                let len_code = len_codes
                    .get(&length)
                    .ok_or_else(|| KdatError::corrupted("length missing from code book"))?;
                writer.write_code(len_code.bits, len_code.len);
            }
        }
    }
    payload.extend_from_slice(&writer.finish());

    if payload.len() < raw.len() {
        debug!(
            "compressed {} -> {} bytes ({} tokens)",
            raw.len(),
            payload.len(),
            tokens.len()
        );
        Ok(EncodedFile {
            storage: Storage::Compressed,
            original_size: raw.len() as u64,
            payload,
        })
    } else {
        debug!(
            "storing raw: encoded {} >= original {}",
            payload.len(),
            raw.len()
        );
        Ok(EncodedFile {
            storage: Storage::Raw,
            original_size: raw.len() as u64,
            payload: raw.to_vec(),
        })
    }
}

/// Decode one file's payload back into its original bytes.
///
/// Any structural violation (truncated tables or bit stream, a Huffman
/// walk hitting end-of-stream, an illegal match, a final size mismatch)
/// is corruption and aborts the caller's archive decode.
pub fn decode_file(storage: Storage, original_size: u64, payload: &[u8]) -> Result<Vec<u8>> {
    match storage {
        Storage::Raw => {
            if payload.len() as u64 != original_size {
                return Err(KdatError::SizeMismatch {
                    expected: original_size,
                    actual: payload.len() as u64,
                });
            }
            Ok(payload.to_vec())
        }
        Storage::Compressed => {
            let mut cursor = ByteCursor::new(payload);
            let lit_table = ByteFreqTable::read_from(&mut cursor)?;
            let len_table = ByteFreqTable::read_from(&mut cursor)?;
            let off_table = OffsetFreqTable::read_from(&mut cursor)?;

            let lit_tree = lit_table.tree();
            let len_tree = len_table.tree();
            let off_tree = off_table.tree();

            let mut reader = BitReader::new(cursor.remaining());
            let mut tokens = Vec::new();

            // The stream carries no token count; stop once the declared
            // size is reached so the final flush padding is never read as
            // tokens. Running out of bits before that is corruption.
            let mut produced: u64 = 0;
            while produced < original_size {
                let flag = reader.read_bit().map_err(|_| {
                    KdatError::corrupted("bit stream ended before the declared size was reached")
                })?;

                if flag {
                    let tree = lit_tree.as_ref().ok_or_else(|| {
                        KdatError::corrupted("literal token but no literal table")
                    })?;
                    let byte = tree.decode_symbol(&mut reader)?;
                    tokens.push(Token::Literal(byte));
                    produced += 1;
                } else {
                    let offsets = off_tree.as_ref().ok_or_else(|| {
                        KdatError::corrupted("match token but no offset table")
                    })?;
                    let lengths = len_tree.as_ref().ok_or_else(|| {
                        KdatError::corrupted("match token but no length table")
                    })?;
                    let offset = offsets.decode_symbol(&mut reader)?;
                    let length = lengths.decode_symbol(&mut reader)?;
                    tokens.push(Token::Match { offset, length });
                    produced += u64::from(length);
                }
            }

            let out = lzss::expand(&tokens)?;
            if out.len() as u64 != original_size {
                return Err(KdatError::SizeMismatch {
                    expected: original_size,
                    actual: out.len() as u64,
                });
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(raw: &[u8], profile: &CompressionProfile) -> EncodedFile {
        let encoded = encode_file(raw, profile).unwrap();
        let decoded = decode_file(encoded.storage, encoded.original_size, &encoded.payload).unwrap();
        assert_eq!(decoded, raw);
        encoded
    }

    #[test]
    fn test_empty_file_is_raw() {
        let encoded = roundtrip(b"", &CompressionProfile::FASTEST);
        assert_eq!(encoded.storage, Storage::Raw);
        assert_eq!(encoded.original_size, 0);
        assert!(encoded.payload.is_empty());
    }

    #[test]
    fn test_tiny_file_demotes_to_raw() {
        // Tables alone dwarf five bytes of input.
        let encoded = roundtrip(b"hello", &CompressionProfile::FASTEST);
        assert_eq!(encoded.storage, Storage::Raw);
        assert_eq!(encoded.payload, b"hello");
        assert_eq!(encoded.stored_size(), encoded.original_size);
    }

    #[test]
    fn test_short_run_demotes_to_raw() {
        // Four zero bytes tokenize to a literal plus one match, but the
        // table overhead still exceeds the input.
        let encoded = roundtrip(&[0u8; 4], &CompressionProfile::FASTEST);
        assert_eq!(encoded.storage, Storage::Raw);
        assert_eq!(encoded.payload, [0u8; 4]);
    }

    #[test]
    fn test_repetitive_file_compresses() {
        let raw = b"ab".repeat(1000);
        let encoded = roundtrip(&raw, &CompressionProfile::BALANCED);
        assert_eq!(encoded.storage, Storage::Compressed);
        assert!(encoded.stored_size() < 200);
        assert!(encoded.stored_size() < encoded.original_size);
    }

    #[test]
    fn test_roundtrip_across_presets() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&b"The quick brown fox jumps over the lazy dog. ".repeat(64));
        raw.extend((0..=255u8).cycle().take(1500));

        for profile in [
            CompressionProfile::FASTEST,
            CompressionProfile::FAST,
            CompressionProfile::BALANCED,
            CompressionProfile::SLOW,
            CompressionProfile::ARCHIVE,
        ] {
            roundtrip(&raw, &profile);
        }
    }

    #[test]
    fn test_all_literals_roundtrip() {
        // No match anywhere: the offset table is empty on the wire.
        let raw: Vec<u8> = (0..=255u8).collect();
        let encoded = encode_file(&raw, &CompressionProfile::FASTEST).unwrap();
        let decoded =
            decode_file(encoded.storage, encoded.original_size, &encoded.payload).unwrap();
        assert_eq!(decoded, raw);
    }

    #[test]
    fn test_raw_payload_size_must_match() {
        assert!(matches!(
            decode_file(Storage::Raw, 10, b"short"),
            Err(KdatError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_compressed_payload_is_corruption() {
        let raw = b"ab".repeat(1000);
        let encoded = encode_file(&raw, &CompressionProfile::BALANCED).unwrap();
        assert_eq!(encoded.storage, Storage::Compressed);

        let truncated = &encoded.payload[..encoded.payload.len() - 2];
        assert!(decode_file(Storage::Compressed, encoded.original_size, truncated).is_err());
    }

    #[test]
    fn test_table_mutations_are_detected() {
        let raw = b"ab".repeat(1000);
        let encoded = encode_file(&raw, &CompressionProfile::BALANCED).unwrap();
        assert_eq!(encoded.storage, Storage::Compressed);

        // Unknown table mode flag.
        let mut mutated = encoded.payload.clone();
        mutated[0] = 7;
        assert!(decode_file(Storage::Compressed, encoded.original_size, &mutated).is_err());

        // Sparse entry count pointing past the payload.
        let mut mutated = encoded.payload.clone();
        mutated[1] = 0xFF;
        mutated[2] = 0x00;
        assert!(decode_file(Storage::Compressed, encoded.original_size, &mutated).is_err());

        // First literal symbol swapped for another byte: decodes to
        // different content or fails outright, never to the original.
        let mut mutated = encoded.payload.clone();
        mutated[3] ^= 0xFF;
        match decode_file(Storage::Compressed, encoded.original_size, &mutated) {
            Ok(decoded) => assert_ne!(decoded, raw),
            Err(_) => {}
        }
    }

    #[test]
    fn test_declared_size_mismatch_is_detected() {
        let raw = b"ab".repeat(1000);
        let encoded = encode_file(&raw, &CompressionProfile::BALANCED).unwrap();
        assert!(decode_file(Storage::Compressed, encoded.original_size + 1, &encoded.payload)
            .is_err());
    }

    #[test]
    fn test_storage_flags() {
        assert_eq!(Storage::Raw.flag(), 0);
        assert_eq!(Storage::Compressed.flag(), 1);
        assert_eq!(Storage::from_flag(0), Some(Storage::Raw));
        assert_eq!(Storage::from_flag(1), Some(Storage::Compressed));
        assert_eq!(Storage::from_flag(2), None);
    }
}
