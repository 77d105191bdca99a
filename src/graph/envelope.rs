use crate::{
    dsp::envelope::{Envelope, EnvelopeParams, EnvelopeState},
    graph::{
        node::{GraphNode, PhaseNode, RenderCtx},
        oscillator::OscNode,
    },
    MAX_BLOCK_SIZE,
};

/// An oscillator shaped by its own ADSR envelope: one FM operator.
///
/// The envelope peaks at the oscillator's amplitude, so the audible output is
/// `unit waveform × level`. In phase mode the envelope levels become the
/// amplitude stream handed to whichever FM stage consumes the phase.
#[derive(Debug, Clone)]
pub struct EnvNode {
    osc: OscNode,
    envelope: Envelope,
    levels: Vec<f32>,
}

impl EnvNode {
    pub fn new(osc: OscNode, params: EnvelopeParams, sample_rate: f32) -> Self {
        let envelope = Envelope::new(params, osc.amplitude(), sample_rate);
        Self {
            osc,
            envelope,
            levels: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn oscillator(&self) -> &OscNode {
        &self.osc
    }

    pub fn oscillator_mut(&mut self) -> &mut OscNode {
        &mut self.osc
    }

    pub fn envelope_state(&self) -> EnvelopeState {
        self.envelope.state()
    }

    pub fn envelope_level(&self) -> f32 {
        self.envelope.level()
    }

    pub fn release(&mut self) {
        self.envelope.release();
    }

    /// Start over as a new operator. The level buffer is kept, so a voice
    /// slot can be reused without allocating.
    pub fn reset(&mut self, osc: OscNode, params: EnvelopeParams, sample_rate: f32) {
        self.envelope = Envelope::new(params, osc.amplitude(), sample_rate);
        self.osc = osc;
    }
}

impl GraphNode for EnvNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        if self.envelope.is_finished() {
            out.fill(0.0);
            return;
        }

        self.osc.render_unit(out, ctx);

        let levels = &mut self.levels[..out.len()];
        self.envelope.render(levels);
        for (o, level) in out.iter_mut().zip(levels.iter()) {
            *o *= *level;
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.osc.note_on(ctx);
    }

    fn note_off(&mut self, _ctx: &RenderCtx) {
        self.envelope.release();
    }

    fn is_active(&self) -> bool {
        !self.envelope.is_finished()
    }
}

impl PhaseNode for EnvNode {
    fn render_phase(&mut self, phase: &mut [f32], amps: &mut [f32], ctx: &RenderCtx) {
        self.osc.render_phase(phase, amps, ctx);
        self.envelope.render(amps);
    }
}
