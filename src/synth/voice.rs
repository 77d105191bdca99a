use crate::{
    graph::node::{GraphNode, RenderCtx},
    synth::{operators::FmGraph, patch::Patch, routing::Routing},
    OSCILLATOR_COUNT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,      // Free slot, renders nothing
    Active,    // Playing, envelopes in attack/decay/sustain
    Releasing, // Key released, envelopes in release
}

/// One voice slot: a private copy of the operator graph for one note.
pub struct Voice {
    state: VoiceState,
    age: u64,
    ctx: RenderCtx,
    graph: FmGraph,
}

impl Voice {
    /// A voice starts idle; [`Voice::start`] triggers it.
    pub fn new(graph: FmGraph, ctx: RenderCtx) -> Self {
        Self {
            state: VoiceState::Idle,
            age: 0,
            ctx,
            graph,
        }
    }

    /// Rebuild this slot for a new note from `patch`, in place.
    pub fn assign(&mut self, patch: &Patch, ctx: RenderCtx) {
        for (operator, config) in self.graph.operators_mut().iter_mut().zip(patch.oscillators()) {
            config.configure(operator, ctx.sample_rate);
        }
        self.graph.reroute(&patch.routing(), patch.enabled());
        self.ctx = ctx;
        self.state = VoiceState::Idle;
    }

    /// Trigger the note; `age` orders voices for eviction.
    pub fn start(&mut self, age: u64) {
        self.state = VoiceState::Active;
        self.age = age;
        self.graph.note_on(&self.ctx);
    }

    pub fn release(&mut self) {
        if self.state == VoiceState::Active {
            self.state = VoiceState::Releasing;
            self.graph.note_off(&self.ctx);
        }
    }

    /// Free the slot at once, release tail or not.
    pub fn silence(&mut self) {
        self.state = VoiceState::Idle;
    }

    /// Follow `routing` from the next block on, keeping every operator's
    /// phase and envelope. Operators not in `enabled` are parked.
    pub fn reroute(&mut self, routing: &Routing, enabled: [bool; OSCILLATOR_COUNT]) {
        self.graph.reroute(routing, enabled);
    }

    /// Retune the carriers that follow the note, as if it had been
    /// triggered at `frequency`. Fixed carriers and modulators keep their pitch.
    pub fn retune(&mut self, frequency: f32) {
        for carrier in self.graph.carriers_mut() {
            let osc = carrier.oscillator_mut();
            if !osc.is_fixed() {
                let ratio = osc.ratio();
                osc.set_frequency(frequency * ratio);
            }
        }
    }

    pub fn frequency(&self) -> f32 {
        self.ctx.frequency
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == VoiceState::Idle
    }

    /// Every carrier envelope has released to silence.
    pub fn is_finished(&self) -> bool {
        !self.graph.is_active()
    }

    pub fn carrier_indices(&self) -> Vec<usize> {
        self.graph.resolved().carriers().collect()
    }
}

impl GraphNode for Voice {
    /// Renders with the voice's own note context; the caller's is ignored.
    fn render_block(&mut self, out: &mut [f32], _ctx: &RenderCtx) {
        if self.is_idle() {
            out.fill(0.0);
            return;
        }
        self.graph.render_block(out, &self.ctx);
    }

    fn note_on(&mut self, _ctx: &RenderCtx) {
        self.start(self.age);
    }

    fn note_off(&mut self, _ctx: &RenderCtx) {
        self.release();
    }

    /// Idle slots do not count as sounding.
    fn is_active(&self) -> bool {
        !self.is_idle() && self.graph.is_active()
    }
}
