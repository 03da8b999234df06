//! LZSS tokenizer: sliding-window match finding and token expansion.
//!
//! The tokenizer walks the input once. At each position it scans the trailing
//! window for the longest match of at least [`MIN_MATCH`] bytes, bounded by
//! the profile's lookahead; positions with no such match emit a literal.
//! Window size and lookahead never travel in the archive: every match
//! carries its offset and length explicitly, so the decoder needs neither.

use kdat_core::error::{KdatError, Result};
use kdat_core::profile::{CompressionProfile, MIN_MATCH};

/// One LZSS emission unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A literal byte.
    Literal(u8),
    /// A back-reference into already-emitted output.
    Match {
        /// Distance back from the current output position, >= 1.
        offset: u32,
        /// Number of bytes to copy, >= 3.
        length: u8,
    },
}

/// Tokenize `input` against the given profile.
pub fn tokenize(input: &[u8], profile: &CompressionProfile) -> Result<Vec<Token>> {
    let window = profile.window_size();
    let lookahead = profile.lookahead();

    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let mut best_len = 0usize;
        let mut best_off = 0usize;
        let start = pos.saturating_sub(window);

        for i in start..pos {
            let mut len = 0;
            while len < lookahead
                && pos + len < input.len()
                && input[i + len] == input[pos + len]
            {
                len += 1;
            }
            // First-found maximum wins: only strictly longer replaces.
            if len > best_len {
                best_len = len;
                best_off = pos - i;
            }
        }

        if best_len >= MIN_MATCH {
            // The lookahead and window bounds make these conversions
            // infallible for legal profiles.
            let length = u8::try_from(best_len)
                .map_err(|_| KdatError::overflow(format!("match length {best_len}")))?;
            let offset = u32::try_from(best_off)
                .map_err(|_| KdatError::overflow(format!("match offset {best_off}")))?;
            tokens.push(Token::Match { offset, length });
            pos += best_len;
        } else {
            tokens.push(Token::Literal(input[pos]));
            pos += 1;
        }
    }

    Ok(tokens)
}

/// Rebuild raw bytes from a token sequence.
///
/// Overlapping copies (`offset < length`) are legal and expand runs.
/// A zero offset, a zero length, or an offset reaching past the bytes
/// emitted so far is corruption.
pub fn expand(tokens: &[Token]) -> Result<Vec<u8>> {
    let mut out = Vec::new();

    for token in tokens {
        match *token {
            Token::Literal(byte) => out.push(byte),
            Token::Match { offset, length } => {
                if length == 0 {
                    return Err(KdatError::corrupted("zero-length match"));
                }
                if offset == 0 || offset as usize > out.len() {
                    return Err(KdatError::invalid_offset(
                        u64::from(offset),
                        out.len() as u64,
                    ));
                }

                let start = out.len() - offset as usize;
                for i in 0..length as usize {
                    let byte = out[start + i];
                    out.push(byte);
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> CompressionProfile {
        CompressionProfile::FASTEST
    }

    #[test]
    fn test_no_repeats_all_literals() {
        let tokens = tokenize(b"abcdef", &profile()).unwrap();
        assert_eq!(tokens.len(), 6);
        assert!(tokens.iter().all(|t| matches!(t, Token::Literal(_))));
    }

    #[test]
    fn test_repeat_becomes_match() {
        let tokens = tokenize(b"abcabc", &profile()).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Literal(b'a'),
                Token::Literal(b'b'),
                Token::Literal(b'c'),
                Token::Match {
                    offset: 3,
                    length: 3
                },
            ]
        );
    }

    #[test]
    fn test_run_compresses_via_overlap() {
        // "aaaa": literal 'a', then an overlapping match copying 3 bytes
        // from offset 1.
        let tokens = tokenize(&[b'a'; 4], &profile()).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Literal(b'a'),
                Token::Match {
                    offset: 1,
                    length: 3
                },
            ]
        );
    }

    #[test]
    fn test_match_length_capped_by_lookahead() {
        let input = vec![0x41u8; 4096];
        let tokens = tokenize(&input, &profile()).unwrap();
        for token in &tokens {
            if let Token::Match { length, .. } = token {
                assert!(*length as usize <= profile().lookahead());
            }
        }
    }

    #[test]
    fn test_emitted_matches_are_legal() {
        let mut input = Vec::new();
        for i in 0..2000u32 {
            input.push((i % 7) as u8);
            input.push((i % 13) as u8);
        }
        let tokens = tokenize(&input, &profile()).unwrap();

        let mut emitted = 0u64;
        for token in &tokens {
            match *token {
                Token::Literal(_) => emitted += 1,
                Token::Match { offset, length } => {
                    assert!(offset >= 1);
                    assert!(u64::from(offset) <= emitted);
                    assert!(length as usize >= MIN_MATCH);
                    assert!(length as usize <= profile().lookahead());
                    emitted += u64::from(length);
                }
            }
        }
        assert_eq!(emitted as usize, input.len());
    }

    #[test]
    fn test_expand_inverts_tokenize() {
        let inputs: Vec<Vec<u8>> = vec![
            b"hello".to_vec(),
            b"Hello Hello Hello World".to_vec(),
            b"ab".repeat(1000),
            vec![0u8; 300],
            (0..=255u8).collect(),
        ];
        for input in inputs {
            let tokens = tokenize(&input, &profile()).unwrap();
            assert_eq!(expand(&tokens).unwrap(), input);
        }
    }

    #[test]
    fn test_expand_overlapping_match() {
        let tokens = vec![
            Token::Literal(b'A'),
            Token::Match {
                offset: 1,
                length: 5,
            },
        ];
        assert_eq!(expand(&tokens).unwrap(), b"AAAAAA");
    }

    #[test]
    fn test_expand_rejects_zero_offset() {
        let tokens = vec![
            Token::Literal(b'x'),
            Token::Match {
                offset: 0,
                length: 3,
            },
        ];
        assert!(matches!(
            expand(&tokens),
            Err(KdatError::InvalidOffset { .. })
        ));
    }

    #[test]
    fn test_expand_rejects_offset_past_output() {
        let tokens = vec![
            Token::Literal(b'x'),
            Token::Match {
                offset: 2,
                length: 3,
            },
        ];
        assert!(matches!(
            expand(&tokens),
            Err(KdatError::InvalidOffset { .. })
        ));
    }

    #[test]
    fn test_expand_rejects_zero_length() {
        let tokens = vec![
            Token::Literal(b'x'),
            Token::Match {
                offset: 1,
                length: 0,
            },
        ];
        assert!(matches!(expand(&tokens), Err(KdatError::Corrupted { .. })));
    }
}
