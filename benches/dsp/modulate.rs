//! Benchmarks for FM stages.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fm_synth::graph::{
    extensions::NodeExt,
    node::{GraphNode, RenderCtx},
    oscillator::OscNode,
};

use crate::BLOCK_SIZES;

pub fn bench_modulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/modulate");
    let ctx = RenderCtx::from_freq(48_000.0, 440.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Plain carrier for reference
        let mut carrier = OscNode::sine();
        carrier.note_on(&ctx);
        group.bench_with_input(BenchmarkId::new("carrier", size), &size, |b, _| {
            b.iter(|| {
                carrier.render_block(black_box(&mut buffer), black_box(&ctx));
            })
        });

        // One modulator: 2:1 ratio, index 2
        let mut pair = OscNode::sine().freq_modulate(OscNode::sine().with_ratio(2.0).with_amplitude(2.0));
        pair.note_on(&ctx);
        group.bench_with_input(BenchmarkId::new("pair", size), &size, |b, _| {
            b.iter(|| {
                pair.render_block(black_box(&mut buffer), black_box(&ctx));
            })
        });

        // Three nested stages
        let mut chain = OscNode::sine().freq_modulate(
            OscNode::sine()
                .with_ratio(2.0)
                .freq_modulate(OscNode::sine().with_ratio(3.0).freq_modulate(OscNode::sine().with_ratio(0.5))),
        );
        chain.note_on(&ctx);
        group.bench_with_input(BenchmarkId::new("chain", size), &size, |b, _| {
            b.iter(|| {
                chain.render_block(black_box(&mut buffer), black_box(&ctx));
            })
        });
    }

    group.finish();
}
