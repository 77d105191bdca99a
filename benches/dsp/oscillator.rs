//! Benchmarks for oscillator waveform generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fm_synth::dsp::oscillator::OscillatorBlock;

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;
const FREQUENCY: f32 = 440.0;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        let waveforms = [
            // Sine - uses sin() transcendental function
            ("sine", OscillatorBlock::sine()),
            // Sawtooth - simple linear ramp
            ("sawtooth", OscillatorBlock::sawtooth()),
            // Square - branch per sample
            ("square", OscillatorBlock::square()),
            // Triangle - absolute value
            ("triangle", OscillatorBlock::triangle()),
            // Noise - xorshift PRNG
            ("noise", OscillatorBlock::noise()),
        ];
        for (name, mut osc) in waveforms {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    osc.render(black_box(&mut buffer), black_box(FREQUENCY), SAMPLE_RATE);
                })
            });
        }

        // Phase only, as consumed by an FM stage
        let mut osc = OscillatorBlock::sine();
        group.bench_with_input(BenchmarkId::new("phase", size), &size, |b, _| {
            b.iter(|| {
                osc.render_phase(black_box(&mut buffer), black_box(FREQUENCY), SAMPLE_RATE);
            })
        });
    }

    group.finish();
}
