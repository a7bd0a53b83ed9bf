//! Benchmarks for the predecessor-table decay kernels and a full build
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pfp_dap::index::{ALPHABET_SIZE, BuildConfig, DecayKernel, build_index};
use pfp_dap::{DocumentBoundaries, PrefixFreeParse};
use tempfile::TempDir;

fn pseudo_random(len: usize, seed: u64) -> Vec<u16> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 48) as u16
        })
        .collect()
}

fn bench_decay_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("decay");

    for num_docs in [4usize, 32, 500] {
        let table = pseudo_random(ALPHABET_SIZE * num_docs, num_docs as u64);
        for kernel in DecayKernel::available() {
            group.bench_with_input(
                BenchmarkId::new(kernel.name(), num_docs),
                &table,
                |b, table| {
                    let mut values = table.clone();
                    let mut bound = 40_000u16;
                    b.iter(|| {
                        bound = bound.wrapping_mul(31).wrapping_add(7);
                        kernel.apply(black_box(&mut values), bound);
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let docs: Vec<Vec<u8>> = (0..8)
        .map(|k| {
            let mut state = 0x5EED + k as u64;
            (0..20_000)
                .map(|_| {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    b"ACGT"[(state >> 62) as usize]
                })
                .collect()
        })
        .collect();
    let docs = DocumentBoundaries::from_documents(&docs).expect("valid documents");
    let parse = PrefixFreeParse::build(docs.text(), 10, 100).expect("parse");
    let dir = TempDir::new().expect("Failed to create temp dir");
    let prefix = dir.path().join("bench");

    c.bench_function("build_8x20k", |b| {
        b.iter(|| build_index(&parse, &docs, &prefix, &BuildConfig::default()).expect("build"))
    });
}

criterion_group!(benches, bench_decay_kernels, bench_build);
criterion_main!(benches);
