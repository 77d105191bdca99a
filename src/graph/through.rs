use crate::graph::node::{GraphNode, RenderCtx};

/*
Serial Signal Chain (Through)
=============================

Through connects two nodes in series, passing the output of the first (source)
into the second (effect). The effect processes the buffer in place.

  Source renders:  [0.5, 0.8, -0.3, 0.9, ...]
  Effect processes in-place (e.g., pass filter)
  Final output:    [0.4, 0.6, -0.2, 0.7, ...]

Example usage:

  let voice = OscNode::sawtooth()
      .through(PassFilter::lowpass(1_000.0, 48_000.0))
      .through(PassFilter::highpass(80.0, 48_000.0));

Through vs AmpModulation vs FreqModulation vs Sum:
--------------------------------------------------
- Through:        Serial processing (source → effect → output)
- AmpModulation:  signal × (1 + modulator)
- FreqModulation: modulator offsets the carrier's phase
- Sum:            Parallel addition of N sources
*/

pub struct Through<S, F> {
    source: S,
    filter: F,
}

impl<S, F> Through<S, F> {
    pub fn new(source: S, filter: F) -> Self {
        Self { source, filter }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut F {
        &mut self.filter
    }
}

impl<S: GraphNode, F: GraphNode> GraphNode for Through<S, F> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.source.render_block(out, ctx);
        self.filter.render_block(out, ctx);
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.source.note_on(ctx);
        self.filter.note_on(ctx);
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.source.note_off(ctx);
        self.filter.note_off(ctx);
    }

    fn is_active(&self) -> bool {
        self.source.is_active()
    }
}
