//! Codec throughput benchmarks across the compression presets.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kdat_codec::file::{decode_file, encode_file};
use kdat_core::profile::CompressionProfile;

/// Mixed payload: compressible text runs interleaved with random spans.
fn test_payload(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(0x6B64_6174);
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        if rng.gen_bool(0.7) {
            data.extend_from_slice(b"the quick brown fox jumps over the lazy dog ");
        } else {
            data.extend((0..32).map(|_| rng.gen::<u8>()));
        }
    }
    data.truncate(len);
    data
}

fn bench_encode(c: &mut Criterion) {
    let data = test_payload(16 * 1024);
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for (name, profile) in [
        ("fastest", CompressionProfile::FASTEST),
        ("balanced", CompressionProfile::BALANCED),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &profile, |b, profile| {
            b.iter(|| encode_file(&data, profile).unwrap());
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let data = test_payload(16 * 1024);
    let encoded = encode_file(&data, &CompressionProfile::BALANCED).unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("balanced", |b| {
        b.iter(|| decode_file(encoded.storage, encoded.original_size, &encoded.payload).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
