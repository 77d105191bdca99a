use crate::graph::{
    amplify::AmpModulation,
    modulate::FreqModulation,
    node::{GraphNode, PhaseNode},
    through::Through,
};

pub trait NodeExt: GraphNode + Sized {
    /// Tremolo: `self × (1 + modulator)`.
    fn amp_modulate<M: GraphNode>(self, modulator: M) -> AmpModulation<Self, M> {
        AmpModulation::new(self, modulator)
    }

    /// Use `self` as the carrier of an FM stage driven by `modulator`.
    fn freq_modulate<M: GraphNode>(self, modulator: M) -> FreqModulation<Self, M>
    where
        Self: PhaseNode,
    {
        FreqModulation::new(self, modulator)
    }

    fn through<F: GraphNode>(self, filter: F) -> Through<Self, F> {
        Through::new(self, filter)
    }
}

impl<T: GraphNode> NodeExt for T {}
