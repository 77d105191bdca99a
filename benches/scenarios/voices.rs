//! Benchmarks for complete voices and the polyphonic synth.
//!
//! One voice per algorithm shows what routing costs; the full synth
//! adds tremolo and the pass filter on top of eight sounding voices.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fm_synth::{
    graph::node::{GraphNode, RenderCtx},
    synth::factory::VoiceFactory,
    Algorithm, EngineConfig, EnvelopeParams, OscillatorConfig, PassFilterConfig, Patch, Synth,
    OSCILLATOR_COUNT,
};

use crate::BLOCK_SIZES;

fn patch(algorithm: Algorithm) -> Patch {
    let envelope = EnvelopeParams::adsr(0.01, 0.2, 0.7, 0.3);
    let modulator = OscillatorConfig::default().ratio(2.0).amplitude(1.5).envelope(envelope);
    let mut oscillators = [modulator; OSCILLATOR_COUNT];
    oscillators[OSCILLATOR_COUNT - 1] = OscillatorConfig::default().envelope(envelope);
    // Patch::new only fails on invalid oscillator settings
    Patch::new(oscillators, algorithm).unwrap()
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");
    let ctx = RenderCtx::from_freq(48_000.0, 110.0); // A2, typical bass note

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === ONE VOICE PER ALGORITHM ===
        for algorithm in [
            Algorithm::Parallel,
            Algorithm::Stack,
            Algorithm::Square,
            Algorithm::ThreeToOne,
        ] {
            let mut voice = patch(algorithm).create_voice(&ctx);
            voice.start(0);
            group.bench_with_input(BenchmarkId::new(algorithm.name(), size), &size, |b, _| {
                b.iter(|| {
                    voice.render_block(black_box(&mut buffer), black_box(&ctx));
                })
            });
        }

        // === FULL SYNTH ===
        // Eight voices, tremolo and a low pass
        let config = EngineConfig {
            block_size: size,
            ..EngineConfig::default()
        };
        let mut synth = Synth::new(config, patch(Algorithm::Stack)).unwrap();
        synth
            .set_am_modulator(Some(OscillatorConfig::default().fixed(5.0).amplitude(0.4)))
            .unwrap();
        synth.set_pass_filter(Some(PassFilterConfig::lowpass(2_500.0))).unwrap();
        for n in 0..config.max_voices {
            synth.note_on(110.0 * (n + 1) as f32).unwrap();
        }
        group.bench_with_input(BenchmarkId::new("synth_full", size), &size, |b, _| {
            b.iter(|| {
                synth.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
