use crate::dsp::oscillator::{OscillatorBlock, OscillatorWaveform};
use crate::graph::node::{GraphNode, PhaseNode, RenderCtx};

/*
Audio Oscillator
================

The oscillator is the sound source of every operator. It has two output
modes:

  audible   render_block: amplitude × waveform(phase)
  phase     render_phase: the raw phase in radians, for an FM stage that
            adds a modulator to it and evaluates the carrier itself

Both modes advance the same phase accumulator, so switching an operator
between carrier and modulator duty never restarts it.

Pitch:
------

A fixed oscillator plays its own frequency regardless of the note. Any
other oscillator follows the note: on note_on its frequency becomes
`ratio × note frequency` (ratio 2.0 = one octave up).

Frequency and amplitude are plain fields read at the start of each block,
so they can be changed between pulls without restarting the stream.

Example usage:
  let carrier = OscNode::sine();                       // follows the note
  let modulator = OscNode::sine().with_ratio(2.0);     // octave above
  let drone = OscNode::square().with_frequency(55.0);  // fixed 55 Hz
*/

#[derive(Debug, Clone)]
pub struct OscNode {
    osc: OscillatorBlock,
    /// Fixed frequency (Hz). If Some, note_on leaves the frequency alone.
    base_frequency: Option<f32>,
    /// Multiple of the note frequency used when not fixed.
    ratio: f32,
    current_frequency: f32,
    amplitude: f32,
}

impl OscNode {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self {
            osc: OscillatorBlock::new(waveform),
            base_frequency: None,
            ratio: 1.0,
            current_frequency: 440.0,
            amplitude: 1.0,
        }
    }

    pub fn sine() -> Self {
        Self::new(OscillatorWaveform::Sine)
    }

    pub fn square() -> Self {
        Self::new(OscillatorWaveform::Square)
    }

    pub fn triangle() -> Self {
        Self::new(OscillatorWaveform::Triangle)
    }

    pub fn sawtooth() -> Self {
        Self::new(OscillatorWaveform::Sawtooth)
    }

    pub fn noise() -> Self {
        Self::new(OscillatorWaveform::Noise)
    }

    /// Set a fixed frequency, ignoring the note pitch.
    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.base_frequency = Some(frequency);
        self.current_frequency = frequency;
        self
    }

    /// Track the note at `ratio` times its frequency.
    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.base_frequency = None;
        self.ratio = ratio;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Retune immediately; takes effect on the next block.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.current_frequency = frequency;
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude;
    }

    pub fn frequency(&self) -> f32 {
        self.current_frequency
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn is_fixed(&self) -> bool {
        self.base_frequency.is_some()
    }

    pub fn waveform(&self) -> OscillatorWaveform {
        self.osc.waveform()
    }

    /// Unit-amplitude waveform, for nodes that shape amplitude themselves.
    pub fn render_unit(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.osc.render(out, self.current_frequency, ctx.sample_rate);
    }
}

impl GraphNode for OscNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.render_unit(out, ctx);
        if self.amplitude != 1.0 {
            for sample in out.iter_mut() {
                *sample *= self.amplitude;
            }
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.current_frequency = match self.base_frequency {
            Some(fixed) => fixed,
            None => ctx.frequency * self.ratio,
        };
    }
}

impl PhaseNode for OscNode {
    fn render_phase(&mut self, phase: &mut [f32], amps: &mut [f32], ctx: &RenderCtx) {
        self.osc.render_phase(phase, self.current_frequency, ctx.sample_rate);
        amps.fill(self.amplitude);
    }
}
