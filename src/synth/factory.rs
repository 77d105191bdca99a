use crate::graph::node::{GraphNode, RenderCtx};

/// Builds the graph for one note.
///
/// This is the "instrument design" layer: the sound is configured once and
/// the synth asks the factory for its pool of independent voices up front.
/// A voice must never share mutable state with the factory or with other
/// voices.
pub trait VoiceFactory: Send {
    type Voice: GraphNode;

    /// `ctx.frequency` is the trigger frequency of the note.
    fn create_voice(&self, ctx: &RenderCtx) -> Self::Voice;
}
