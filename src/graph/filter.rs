use crate::{
    dsp::filter::{ButterworthFilter, FilterType},
    graph::node::{GraphNode, RenderCtx},
};

/// In-place low/high pass stage; chain it after a source with `.through()`.
///
/// The filter is designed for a fixed sample rate at construction. Its
/// recursion state persists from block to block, so a signal split into
/// blocks comes out exactly as if it had been filtered in one pass.
#[derive(Debug, Clone)]
pub struct PassFilter {
    filter: ButterworthFilter,
}

impl PassFilter {
    pub fn new(filter_type: FilterType, cutoff_hz: f32, sample_rate: f32) -> Self {
        Self {
            filter: ButterworthFilter::new(filter_type, cutoff_hz, sample_rate),
        }
    }

    pub fn lowpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::LowPass, cutoff_hz, sample_rate)
    }

    pub fn highpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::HighPass, cutoff_hz, sample_rate)
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.filter.set_cutoff(cutoff_hz);
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.filter.cutoff_hz()
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter.filter_type()
    }

    pub fn magnitude_response(&self, frequency: f32) -> f32 {
        self.filter.magnitude_response(frequency)
    }

    pub fn reset(&mut self) {
        self.filter.reset();
    }
}

impl GraphNode for PassFilter {
    fn render_block(&mut self, out: &mut [f32], _ctx: &RenderCtx) {
        self.filter.render(out);
    }
}

/// An optional stage: `None` leaves the signal untouched.
impl GraphNode for Option<PassFilter> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        if let Some(filter) = self {
            filter.render_block(out, ctx);
        }
    }
}
