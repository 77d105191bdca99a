use std::{
    f32::consts::{PI, TAU},
    str::FromStr,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OscillatorWaveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
    Noise,
}

impl FromStr for OscillatorWaveform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Ok(Self::Sine),
            "square" => Ok(Self::Square),
            "triangle" => Ok(Self::Triangle),
            "sawtooth" | "saw" => Ok(Self::Sawtooth),
            "noise" => Ok(Self::Noise),
            _ => Err(Error::UnknownWaveform(s.to_string())),
        }
    }
}

/// Phase accumulator plus waveform evaluation.
///
/// Frequency is passed on every render call so callers can retune between
/// blocks without restarting the phase.
#[derive(Debug, Clone)]
pub struct OscillatorBlock {
    waveform: OscillatorWaveform,
    phase: f32, // radians, kept in [0, TAU)
    rng_state: u32,
}

impl OscillatorBlock {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
            rng_state: 0x9E37_79B9,
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

    pub fn waveform(&self) -> OscillatorWaveform {
        self.waveform
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Return the current phase and step the accumulator by one sample.
    #[inline]
    fn advance(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let current = self.phase;
        self.phase += TAU * frequency / sample_rate;
        if !(0.0..TAU).contains(&self.phase) {
            self.phase = self.phase.rem_euclid(TAU);
        }
        current
    }

    #[inline]
    fn evaluate(&mut self, phase: f32) -> f32 {
        match self.waveform {
            OscillatorWaveform::Sine => phase.sin(),
            OscillatorWaveform::Square => {
                if phase < PI {
                    1.0
                } else {
                    -1.0
                }
            }
            OscillatorWaveform::Triangle => {
                let t = phase / TAU;
                1.0 - 4.0 * (t - 0.5).abs()
            }
            OscillatorWaveform::Sawtooth => 2.0 * (phase / TAU) - 1.0,
            OscillatorWaveform::Noise => {
                // xorshift32, no allocation
                self.rng_state ^= self.rng_state << 13;
                self.rng_state ^= self.rng_state >> 17;
                self.rng_state ^= self.rng_state << 5;
                (self.rng_state as f32 / u32::MAX as f32) * 2.0 - 1.0
            }
        }
    }

    /// Fill `out` with the unit-amplitude waveform.
    pub fn render(&mut self, out: &mut [f32], frequency: f32, sample_rate: f32) {
        for sample in out.iter_mut() {
            let phase = self.advance(frequency, sample_rate);
            *sample = self.evaluate(phase);
        }
    }

    /// Fill `out` with the raw instantaneous phase (radians) instead of the
    /// evaluated waveform. This is what an FM stage consumes.
    pub fn render_phase(&mut self, out: &mut [f32], frequency: f32, sample_rate: f32) {
        for sample in out.iter_mut() {
            *sample = self.advance(frequency, sample_rate);
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}
