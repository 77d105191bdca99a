use crate::{
    graph::{
        envelope::EnvNode,
        modulate::evaluate_carrier,
        node::{GraphNode, PhaseNode, RenderCtx},
    },
    synth::routing::{Resolved, Routing},
    MAX_BLOCK_SIZE, OSCILLATOR_COUNT,
};

/*
Operator Graph
==============

One voice's four operators, rendered under a resolved routing:

    for i in 0..4, enabled only:
        out[i] = modulated ? amp · cos(phase + mod[i]) : operator output
        carrier ? mix += out[i] : mod[j] += out[i] for each destination j

    voice = mix / carrier count

Every operator lives in a fixed slot for the whole life of the voice.
Disabled operators are parked, not dropped: they stop advancing and pick
up where they left off once enabled again. Rerouting only replaces the
resolved plan, so nothing is built or freed while the voice sounds.

All scratch buffers are sized for MAX_BLOCK_SIZE up front.
*/

pub struct FmGraph {
    operators: [EnvNode; OSCILLATOR_COUNT],
    resolved: Resolved,
    /// One modulation input per operator, MAX_BLOCK_SIZE apart.
    modulation: Vec<f32>,
    phase: Vec<f32>,
    amps: Vec<f32>,
    signal: Vec<f32>,
}

impl FmGraph {
    pub fn new(
        operators: [EnvNode; OSCILLATOR_COUNT],
        routing: &Routing,
        enabled: [bool; OSCILLATOR_COUNT],
    ) -> Self {
        Self {
            operators,
            resolved: routing.final_output(enabled),
            modulation: vec![0.0; OSCILLATOR_COUNT * MAX_BLOCK_SIZE],
            phase: vec![0.0; MAX_BLOCK_SIZE],
            amps: vec![0.0; MAX_BLOCK_SIZE],
            signal: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Follow a new routing from the next block on. Operator state is untouched.
    pub fn reroute(&mut self, routing: &Routing, enabled: [bool; OSCILLATOR_COUNT]) {
        self.resolved = routing.final_output(enabled);
    }

    pub fn resolved(&self) -> &Resolved {
        &self.resolved
    }

    pub fn operator(&self, index: usize) -> &EnvNode {
        &self.operators[index]
    }

    pub fn operators_mut(&mut self) -> &mut [EnvNode; OSCILLATOR_COUNT] {
        &mut self.operators
    }

    /// The operators currently heard directly.
    pub fn carriers_mut(&mut self) -> impl Iterator<Item = &mut EnvNode> + '_ {
        let resolved = self.resolved;
        self.operators
            .iter_mut()
            .enumerate()
            .filter(move |(index, _)| resolved.is_carrier(*index))
            .map(|(_, operator)| operator)
    }
}

impl GraphNode for FmGraph {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        out.fill(0.0);
        let carriers = self.resolved.carrier_count();
        if carriers == 0 {
            return;
        }

        let len = out.len();
        for input in self.modulation.chunks_mut(MAX_BLOCK_SIZE) {
            input[..len].fill(0.0);
        }

        for index in 0..OSCILLATOR_COUNT {
            if !self.resolved.is_enabled(index) {
                continue;
            }

            let signal = &mut self.signal[..len];
            let operator = &mut self.operators[index];
            if self.resolved.is_modulated(index) {
                let phase = &mut self.phase[..len];
                let amps = &mut self.amps[..len];
                let start = index * MAX_BLOCK_SIZE;
                operator.render_phase(phase, amps, ctx);
                evaluate_carrier(phase, amps, &self.modulation[start..start + len], signal);
            } else {
                operator.render_block(signal, ctx);
            }

            if self.resolved.is_carrier(index) {
                for (o, s) in out.iter_mut().zip(signal.iter()) {
                    *o += *s;
                }
                continue;
            }
            for target in self.resolved.targets(index).iter() {
                let start = target * MAX_BLOCK_SIZE;
                for (m, s) in self.modulation[start..start + len].iter_mut().zip(signal.iter()) {
                    *m += *s;
                }
            }
        }

        let gain = 1.0 / carriers as f32;
        if gain != 1.0 {
            for o in out.iter_mut() {
                *o *= gain;
            }
        }
    }

    /// Disabled operators are triggered too, so enabling one mid-note
    /// brings it in at the right pitch.
    fn note_on(&mut self, ctx: &RenderCtx) {
        for operator in self.operators.iter_mut() {
            operator.note_on(ctx);
        }
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        for operator in self.operators.iter_mut() {
            operator.note_off(ctx);
        }
    }

    /// Audible while any carrier's envelope is.
    fn is_active(&self) -> bool {
        self.resolved
            .carriers()
            .any(|index| self.operators[index].is_active())
    }
}
