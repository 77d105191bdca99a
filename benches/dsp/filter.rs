//! Benchmarks for the third-order Butterworth pass filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fm_synth::dsp::filter::ButterworthFilter;

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sawtooth-like ramp)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        let filters = [
            ("lowpass", ButterworthFilter::lowpass(1000.0, 48_000.0)),
            ("highpass", ButterworthFilter::highpass(1000.0, 48_000.0)),
        ];
        for (name, mut filter) in filters {
            let mut buffer = input.clone();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    filter.render(black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}
