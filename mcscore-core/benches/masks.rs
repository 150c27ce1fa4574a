//! Attention bias and position id construction benchmarks.
//!
//! Run with: cargo bench --package mcscore-core --bench masks
//! Run with Metal: cargo bench --package mcscore-core --bench masks --features metal

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box as bb;

use candle_core::{DType, Device, Result, Tensor};
use mcscore_core::{AttentionMaskBuilder, PositionIndexer};

/// Batch shapes for benchmarking (flattened example x candidate rows)
struct MaskConfig {
    name: &'static str,
    rows: usize,
    prompt_len: usize,
    candidate_len: usize,
}

impl MaskConfig {
    const fn new(name: &'static str, rows: usize, prompt_len: usize, candidate_len: usize) -> Self {
        Self {
            name,
            rows,
            prompt_len,
            candidate_len,
        }
    }

    const fn total_len(&self) -> usize {
        self.prompt_len + self.candidate_len
    }
}

const CONFIGS: &[MaskConfig] = &[
    // Short prompts, a few single-word answers
    MaskConfig::new("rows4_p32_c4", 4, 32, 4),
    // Typical prompted multiple choice
    MaskConfig::new("rows16_p256_c16", 16, 256, 16),
    // Long context, sentence-length answers
    MaskConfig::new("rows32_p1024_c64", 32, 1024, 64),
];

fn get_device() -> Device {
    #[cfg(feature = "metal")]
    {
        Device::new_metal(0).expect("Metal device should be available")
    }
    #[cfg(feature = "cuda")]
    {
        Device::cuda_if_available(0).expect("CUDA device should be available")
    }
    #[cfg(not(any(feature = "metal", feature = "cuda")))]
    {
        Device::Cpu
    }
}

/// Padding mask with a quarter of each row left-padded
fn create_padding_mask(config: &MaskConfig, device: &Device) -> Result<Tensor> {
    let total = config.total_len();
    let pad = config.prompt_len / 4;
    let row: Vec<u32> = (0..total).map(|i| u32::from(i >= pad)).collect();
    let data: Vec<u32> = row.iter().copied().cycle().take(config.rows * total).collect();
    Tensor::from_vec(data, (config.rows, total), device)
}

/// Benchmark: padding-only bias [rows, 1, total, total]
fn bench_expand(c: &mut Criterion) {
    let device = get_device();
    let mut group = c.benchmark_group("mask_expand");

    for config in CONFIGS {
        let mask = create_padding_mask(config, &device).expect("mask creation");
        group.throughput(Throughput::Elements((config.rows * config.total_len() * config.total_len()) as u64));

        group.bench_with_input(BenchmarkId::from_parameter(config.name), config, |b, _cfg| {
            b.iter(|| {
                let bias = AttentionMaskBuilder.expand(&mask, None, DType::F32).expect("expand");
                device.synchronize().ok();
                bb(bias.elem_count())
            });
        });
    }

    group.finish();
}

/// Benchmark: padding bias merged with the candidate-span causal bias
fn bench_prefix_causal(c: &mut Criterion) {
    let device = get_device();
    let mut group = c.benchmark_group("mask_prefix_causal");

    for config in CONFIGS {
        let mask = create_padding_mask(config, &device).expect("mask creation");
        group.throughput(Throughput::Elements((config.rows * config.total_len() * config.total_len()) as u64));

        group.bench_with_input(BenchmarkId::from_parameter(config.name), config, |b, cfg| {
            b.iter(|| {
                let bias = AttentionMaskBuilder
                    .prefix_causal(&mask, cfg.prompt_len, cfg.candidate_len, DType::F32)
                    .expect("prefix causal");
                device.synchronize().ok();
                bb(bias.elem_count())
            });
        });
    }

    group.finish();
}

/// Benchmark: masked running count for position ids
fn bench_positions(c: &mut Criterion) {
    let device = get_device();
    let mut group = c.benchmark_group("position_ids");

    for config in CONFIGS {
        let mask = create_padding_mask(config, &device).expect("mask creation");
        group.throughput(Throughput::Elements((config.rows * config.total_len()) as u64));

        group.bench_with_input(BenchmarkId::from_parameter(config.name), config, |b, _cfg| {
            b.iter(|| {
                let pos = PositionIndexer.positions(&mask).expect("positions");
                device.synchronize().ok();
                bb(pos.elem_count())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_expand, bench_prefix_causal, bench_positions);
criterion_main!(benches);
