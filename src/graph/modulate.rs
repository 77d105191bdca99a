use crate::{
    graph::node::{GraphNode, PhaseNode, RenderCtx},
    MAX_BLOCK_SIZE,
};

/*
Frequency Modulation
====================

A carrier's instantaneous phase is offset by the output of a modulator:

    out(n) = amp(n) · cos(phase(n) + mod(n))

where `phase` and `amp` come from the carrier in phase mode and `mod` is
the modulator's ordinary audible output. The modulator's amplitude is the
modulation index in radians: a modulator peaking at 0.0 leaves the carrier
untouched, one peaking at 2.0 spreads energy into several sidebands.

Because phase offsets would be identical with sin or cos, a carrier whose
modulator is silent renders as a cosine, a quarter-cycle ahead of the same
oscillator played on its own.

Chaining
--------

A FreqModulation is itself a phase node. In phase mode it reports
`phase + mod` and passes the carrier's amplitude through untouched, so a
further modulation stage can add its own offset before anything is
evaluated:

    FM(FM(c, m1), m2)  →  amp · cos(phase_c + m1 + m2)

That is how one carrier takes several modulators, and how stacks like
m3 → m2 → m1 → c are built: each modulator in the chain is itself
rendered in audible mode, so `FM(m1, m2)` yields a modulated signal that
then offsets `c`.

Example usage:
  let carrier = EnvNode::new(OscNode::sine(), params, sr);
  let modulator = EnvNode::new(OscNode::sine().with_ratio(2.0), params, sr);
  let voice = carrier.freq_modulate(modulator);
*/

/// `out = amps · cos(phase + modulation)`, sample by sample.
pub fn evaluate_carrier(phase: &[f32], amps: &[f32], modulation: &[f32], out: &mut [f32]) {
    for (((o, p), a), m) in out
        .iter_mut()
        .zip(phase.iter())
        .zip(amps.iter())
        .zip(modulation.iter())
    {
        *o = a * (p + m).cos();
    }
}

#[derive(Debug, Clone)]
pub struct FreqModulation<S, M> {
    source: S,
    modulator: M,
    mod_buffer: Vec<f32>,
    phase_buffer: Vec<f32>,
    amp_buffer: Vec<f32>,
}

impl<S, M> FreqModulation<S, M> {
    pub fn new(source: S, modulator: M) -> Self {
        Self {
            source,
            modulator,
            mod_buffer: vec![0.0; MAX_BLOCK_SIZE],
            phase_buffer: vec![0.0; MAX_BLOCK_SIZE],
            amp_buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn modulator(&self) -> &M {
        &self.modulator
    }

    pub fn modulator_mut(&mut self) -> &mut M {
        &mut self.modulator
    }
}

impl<S: PhaseNode, M: GraphNode> GraphNode for FreqModulation<S, M> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let len = out.len();
        let phase = &mut self.phase_buffer[..len];
        let amps = &mut self.amp_buffer[..len];
        let modulation = &mut self.mod_buffer[..len];

        self.source.render_phase(phase, amps, ctx);
        self.modulator.render_block(modulation, ctx);
        evaluate_carrier(phase, amps, modulation, out);
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.source.note_on(ctx);
        self.modulator.note_on(ctx);
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.source.note_off(ctx);
        self.modulator.note_off(ctx);
    }

    /// Audible only while the carrier is.
    fn is_active(&self) -> bool {
        self.source.is_active()
    }
}

impl<S: PhaseNode, M: GraphNode> PhaseNode for FreqModulation<S, M> {
    fn render_phase(&mut self, phase: &mut [f32], amps: &mut [f32], ctx: &RenderCtx) {
        let modulation = &mut self.mod_buffer[..phase.len()];

        self.source.render_phase(phase, amps, ctx);
        self.modulator.render_block(modulation, ctx);

        for (p, m) in phase.iter_mut().zip(modulation.iter()) {
            *p += *m;
        }
    }
}
