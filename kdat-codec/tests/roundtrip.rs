//! Codec round-trip properties over larger, mixed-shape inputs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kdat_codec::file::{decode_file, encode_file, Storage};
use kdat_codec::lzss::{self, Token};
use kdat_core::profile::{CompressionProfile, MIN_MATCH};

fn presets() -> [CompressionProfile; 5] {
    [
        CompressionProfile::FASTEST,
        CompressionProfile::FAST,
        CompressionProfile::BALANCED,
        CompressionProfile::SLOW,
        CompressionProfile::ARCHIVE,
    ]
}

/// A payload exercising runs, text repetition, and incompressible spans.
fn mixed_payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        match rng.gen_range(0..3) {
            0 => data.extend_from_slice(&[rng.gen::<u8>()].repeat(rng.gen_range(1..400))),
            1 => data.extend_from_slice(b"pack my box with five dozen liquor jugs. "),
            _ => data.extend((0..rng.gen_range(1..200)).map(|_| rng.gen::<u8>())),
        }
    }
    data.truncate(len);
    data
}

#[test]
fn test_roundtrip_mixed_payloads_all_presets() {
    for (seed, len) in [(1u64, 500usize), (2, 2000), (3, 6000)] {
        let data = mixed_payload(len, seed);
        for profile in presets() {
            let encoded = encode_file(&data, &profile).unwrap();
            let decoded =
                decode_file(encoded.storage, encoded.original_size, &encoded.payload).unwrap();
            assert_eq!(decoded, data, "seed {seed} len {len} profile {profile}");

            match encoded.storage {
                Storage::Raw => assert_eq!(encoded.stored_size(), encoded.original_size),
                Storage::Compressed => assert!(encoded.stored_size() < encoded.original_size),
            }
        }
    }
}

#[test]
fn test_roundtrip_larger_payload_small_window() {
    // The brute-force window scan is quadratic in the window, so the
    // larger input runs against the 4 KiB preset only.
    let data = mixed_payload(30_000, 11);
    let encoded = encode_file(&data, &CompressionProfile::FASTEST).unwrap();
    let decoded = decode_file(encoded.storage, encoded.original_size, &encoded.payload).unwrap();
    assert_eq!(decoded, data);
}

#[test]
fn test_roundtrip_pure_random_demotes_to_raw() {
    let mut rng = StdRng::seed_from_u64(99);
    let data: Vec<u8> = (0..8192).map(|_| rng.gen()).collect();

    let encoded = encode_file(&data, &CompressionProfile::BALANCED).unwrap();
    assert_eq!(encoded.storage, Storage::Raw);
    assert_eq!(encoded.payload, data);

    let decoded = decode_file(encoded.storage, encoded.original_size, &encoded.payload).unwrap();
    assert_eq!(decoded, data);
}

#[test]
fn test_every_emitted_match_is_legal() {
    let data = mixed_payload(6000, 17);
    for profile in presets() {
        let tokens = lzss::tokenize(&data, &profile).unwrap();
        let mut emitted = 0u64;
        for token in &tokens {
            match *token {
                Token::Literal(_) => emitted += 1,
                Token::Match { offset, length } => {
                    assert!(offset >= 1);
                    assert!(u64::from(offset) <= emitted);
                    assert!(
                        u64::from(offset) <= profile.window_size() as u64,
                        "offset may not reach past the window"
                    );
                    assert!((length as usize) >= MIN_MATCH);
                    assert!((length as usize) <= profile.lookahead());
                    emitted += u64::from(length);
                }
            }
        }
        assert_eq!(emitted as usize, data.len());
        assert_eq!(lzss::expand(&tokens).unwrap(), data);
    }
}
