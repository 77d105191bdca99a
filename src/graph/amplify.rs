use crate::{
    graph::node::{GraphNode, RenderCtx},
    MAX_BLOCK_SIZE,
};

/*
Amplitude Modulation (Tremolo)
==============================

The modulator is read as a displacement around unity gain, not as a gain
on its own:

    out[n] = signal[n] · (1 + modulator[n])

A modulator swinging between -0.3 and +0.3 makes the signal pulse between
70% and 130% of its level. A silent modulator leaves the signal untouched,
which is why this is not ring modulation: ring modulation (`signal × m`)
would silence the signal whenever the modulator crosses zero.

The modulator is optional. Without one the node passes the signal through
unchanged, so a synth can keep a single output chain and only swap the
modulator in and out.

Example usage:
  let tremolo = voices.amp_modulate(OscNode::sine().with_frequency(5.0).with_amplitude(0.3));
*/

pub struct AmpModulation<S, M> {
    signal: S,
    modulator: Option<M>,
    temp_buffer: Vec<f32>,
}

impl<S, M> AmpModulation<S, M> {
    pub fn new(signal: S, modulator: M) -> Self {
        Self::with_modulator(signal, Some(modulator))
    }

    /// Pass `signal` through until a modulator is assigned.
    pub fn bypass(signal: S) -> Self {
        Self::with_modulator(signal, None)
    }

    fn with_modulator(signal: S, modulator: Option<M>) -> Self {
        Self {
            signal,
            modulator,
            temp_buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn set_modulator(&mut self, modulator: Option<M>) {
        self.modulator = modulator;
    }

    pub fn modulator(&self) -> Option<&M> {
        self.modulator.as_ref()
    }

    pub fn signal(&self) -> &S {
        &self.signal
    }

    pub fn signal_mut(&mut self) -> &mut S {
        &mut self.signal
    }
}

impl<S: GraphNode, M: GraphNode> GraphNode for AmpModulation<S, M> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.signal.render_block(out, ctx);

        let Some(modulator) = self.modulator.as_mut() else {
            return;
        };

        // Slice temp buffer to match output size (RT-safe, no allocation)
        let frames = &mut self.temp_buffer[..out.len()];
        modulator.render_block(frames, ctx);

        for (o, m) in out.iter_mut().zip(frames.iter()) {
            *o *= 1.0 + *m;
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.signal.note_on(ctx);
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.signal.note_off(ctx);
    }

    fn is_active(&self) -> bool {
        self.signal.is_active()
    }
}
