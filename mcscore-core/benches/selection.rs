//! Candidate selection benchmarks: log-softmax, gather, masked sum, argmax.
//!
//! Run with: cargo bench --package mcscore-core --bench selection

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box as bb;

use candle_core::{DType, Device, Tensor};
use mcscore_core::{CandidateSelector, Grouping, LengthNormalization, ScoreDType};

/// (name, examples, candidates per example, candidate_len, vocab)
const CONFIGS: &[(&str, usize, usize, usize, usize)] = &[
    ("ex8_k4_c4_v32k", 8, 4, 4, 32_000),
    ("ex8_k4_c16_v32k", 8, 4, 16, 32_000),
    ("ex4_k8_c8_v150k", 4, 8, 8, 150_000),
];

fn bench_select(c: &mut Criterion) {
    let device = Device::Cpu;
    let mut group = c.benchmark_group("candidate_select");
    group.sample_size(20);

    for &(name, examples, k, len, vocab) in CONFIGS {
        let rows = examples * k;
        let logits = Tensor::randn(0f32, 1f32, (rows, len, vocab), &device).expect("logits");
        let ids = Tensor::zeros((rows, len), DType::U32, &device).expect("ids");
        let mask = Tensor::ones((rows, len), DType::U32, &device).expect("mask");
        let grouping = Grouping::uniform(examples);
        group.throughput(Throughput::Elements((rows * len * vocab) as u64));

        for (label, dtype) in [("f32", ScoreDType::F32), ("f64", ScoreDType::F64)] {
            let selector = CandidateSelector::new(LengthNormalization::Sum, dtype);
            group.bench_with_input(BenchmarkId::new(label, name), &rows, |b, _| {
                b.iter(|| {
                    let out = selector.select(&logits, &ids, &mask, &grouping).expect("select");
                    bb(out.predictions.len())
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_select);
criterion_main!(benches);
