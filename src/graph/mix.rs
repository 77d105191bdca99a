use crate::{
    graph::node::{GraphNode, RenderCtx},
    MAX_BLOCK_SIZE,
};

/*
Summing Mixer
=============

Sum adds any number of parallel sources sample by sample:

    out[n] = gain · Σ source_k[n]

    gain = amplitude / N   when normalise is set
    gain = amplitude       otherwise

Normalising keeps N equal sources at the level of one. That matters in two
places: the carriers of one voice (up to four with the parallel algorithm)
and the voices of the synth (up to max_voices). Without it, every extra
carrier or held key would raise the level until the output clips.

Only active sources are rendered and counted, so a pool of voices can sit
in the mixer for good and idle slots neither cost time nor dilute the mix.
An empty or fully inactive Sum renders silence.
*/

pub struct Sum<S> {
    sources: Vec<S>,
    amplitude: f32,
    normalise: bool,
    temp_buffer: Vec<f32>,
}

impl<S> Sum<S> {
    pub fn new(sources: Vec<S>, amplitude: f32, normalise: bool) -> Self {
        Self {
            sources,
            amplitude,
            normalise,
            temp_buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Unit amplitude, normalised by the number of sources.
    pub fn normalised(sources: Vec<S>) -> Self {
        Self::new(sources, 1.0, true)
    }

    pub fn push(&mut self, source: S) {
        self.sources.push(source);
    }

    pub fn sources(&self) -> &[S] {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut [S] {
        &mut self.sources
    }

    pub fn into_sources(self) -> Vec<S> {
        self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl<S: GraphNode> Sum<S> {
    /// Number of sources currently contributing to the mix.
    pub fn active_count(&self) -> usize {
        self.sources.iter().filter(|s| s.is_active()).count()
    }

    pub fn gain(&self) -> f32 {
        let active = self.active_count();
        if self.normalise && active > 0 {
            self.amplitude / active as f32
        } else {
            self.amplitude
        }
    }
}

impl<S: GraphNode> GraphNode for Sum<S> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        out.fill(0.0);
        if !self.is_active() {
            return;
        }

        let gain = self.gain();
        let frames = &mut self.temp_buffer[..out.len()];
        for source in self.sources.iter_mut().filter(|s| s.is_active()) {
            source.render_block(frames, ctx);
            for (o, s) in out.iter_mut().zip(frames.iter()) {
                *o += *s;
            }
        }

        if gain != 1.0 {
            for o in out.iter_mut() {
                *o *= gain;
            }
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        for source in self.sources.iter_mut() {
            source.note_on(ctx);
        }
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        for source in self.sources.iter_mut() {
            source.note_off(ctx);
        }
    }

    fn is_active(&self) -> bool {
        self.sources.iter().any(|s| s.is_active())
    }
}
