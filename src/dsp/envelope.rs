#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/*
Exponential ADSR Envelope
=========================

The envelope shapes an operator's amplitude over the life of a note. Each
stage follows an exponential curve, the same shape as a capacitor charging
or discharging through a resistor.

Vocabulary
----------

  amplitude   The envelope's current output value, in the same units as the
              oscillator amplitude it shapes (0.0 to max_amplitude).

  asymptote   The value a stage's curve heads towards but never reaches.
              It sits one `target` beyond the level the stage aims for, so
              the curve crosses the aim level in finite time.

  target      Small positive distance between the aim level and the
              asymptote. Small targets give strongly curved stages, large
              targets give nearly linear ones.

  multiplier  Per-sample decay factor of the distance to the asymptote.


The Iteration
-------------

A curve of the form

    y(n) = A + (y0 - A) * exp(r * n)

can be produced without calling exp() per sample:

    y(n + 1) = A * (1 - exp(r)) + y(n) * exp(r)
             = offset + y(n) * multiplier

Solving for the rate so the curve covers the distance from the start level
to the aim level in `duration * sample_rate` samples gives

    multiplier = exp( ln(target / |A - y0|) / (duration * sample_rate) )
    offset     = A * (1 - multiplier)

with

    attack:   y0 = 0,        A = max + attack_target
    decay:    y0 = max,      A = sustain - dr_target
    release:  y0 = level,    A = -dr_target


The State Machine
-----------------

    ┌────────┐ amp >= max ┌───────┐ amp <= sustain ┌─────────┐
    │ Attack │ ─────────→ │ Decay │ ─────────────→ │ Sustain │
    └────────┘            └───────┘                └─────────┘
         │                    │                         │
         └──────── release() ─┴─────────────────────────┘
                              ↓
                         ┌─────────┐ amp <= 0
                         │ Release │ ─────────→ silent forever
                         └─────────┘

A stage with zero duration is skipped without emitting a sample at its
starting level: zero attack starts at max, zero decay drops straight to
sustain, zero release falls silent immediately.

Transitions are checked every sample and the amplitude is clamped to the
stage's aim level, so attack never overshoots and decay never undershoots.
*/

/// Stage durations (seconds), sustain fraction and curve targets.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub attack: f32,
    pub decay: f32,
    /// Fraction of the operator amplitude held during sustain (0.0 to 1.0).
    pub sustain: f32,
    pub release: f32,
    pub attack_target: f32,
    pub decay_release_target: f32,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack: 0.05,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
            attack_target: 0.3,
            decay_release_target: 0.001,
        }
    }
}

impl EnvelopeParams {
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, duration) in [
            ("attack must be finite and >= 0", self.attack),
            ("decay must be finite and >= 0", self.decay),
            ("release must be finite and >= 0", self.release),
        ] {
            if !(duration.is_finite() && duration >= 0.0) {
                return Err(Error::InvalidEnvelope(name));
            }
        }
        if !(0.0..=1.0).contains(&self.sustain) {
            return Err(Error::InvalidEnvelope("sustain must lie in 0..=1"));
        }
        if !(self.attack_target.is_finite() && self.attack_target > 0.0) {
            return Err(Error::InvalidEnvelope("attack target must be positive"));
        }
        if !(self.decay_release_target.is_finite() && self.decay_release_target > 0.0) {
            return Err(Error::InvalidEnvelope("decay/release target must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Precomputed exponential step for one stage.
#[derive(Debug, Clone, Copy)]
struct Curve {
    multiplier: f32,
    offset: f32,
}

impl Curve {
    /// `None` for a zero-length stage, which is skipped.
    fn derive(start: f32, asymptote: f32, target: f32, duration: f32, sample_rate: f32) -> Option<Self> {
        if duration <= 0.0 {
            return None;
        }
        let samples = f64::from(duration) * f64::from(sample_rate);
        let distance = f64::from(asymptote - start).abs();
        let rate = (f64::from(target) / distance).ln() / samples;
        let multiplier = rate.exp();
        Some(Self {
            multiplier: multiplier as f32,
            offset: (f64::from(asymptote) * (1.0 - multiplier)) as f32,
        })
    }

    #[inline]
    fn step(&self, amplitude: f32) -> f32 {
        self.offset + amplitude * self.multiplier
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    params: EnvelopeParams,
    sample_rate: f32,
    max_amplitude: f32,
    sustain_level: f32,

    // Derived once per voice; release is derived when it is triggered
    attack: Option<Curve>,
    decay: Option<Curve>,
    release: Option<Curve>,

    state: EnvelopeState,
    amplitude: f32,
}

impl Envelope {
    /// Build an envelope in the attack stage, peaking at `max_amplitude`.
    ///
    /// `params` are expected to have passed [`EnvelopeParams::validate`].
    pub fn new(params: EnvelopeParams, max_amplitude: f32, sample_rate: f32) -> Self {
        let sustain_level = params.sustain * max_amplitude;
        let attack = Curve::derive(
            0.0,
            max_amplitude + params.attack_target,
            params.attack_target,
            params.attack,
            sample_rate,
        );
        let decay = Curve::derive(
            max_amplitude,
            sustain_level - params.decay_release_target,
            params.decay_release_target,
            params.decay,
            sample_rate,
        );

        Self {
            params,
            sample_rate,
            max_amplitude,
            sustain_level,
            attack,
            decay,
            release: None,
            state: EnvelopeState::Attack,
            amplitude: 0.0,
        }
    }

    /// Move to the release stage from wherever the envelope is.
    pub fn release(&mut self) {
        if self.state == EnvelopeState::Release {
            return;
        }
        // From sustain this is the same curve as deriving against the
        // sustain level; from earlier stages it starts at the current level.
        self.release = Curve::derive(
            self.amplitude,
            -self.params.decay_release_target,
            self.params.decay_release_target,
            self.params.release,
            self.sample_rate,
        );
        if self.release.is_none() || self.amplitude <= 0.0 {
            self.amplitude = 0.0;
        }
        self.state = EnvelopeState::Release;
    }

    /// Emit the current amplitude and advance one sample.
    pub fn next_sample(&mut self) -> f32 {
        loop {
            match self.state {
                EnvelopeState::Attack => match self.attack {
                    None => {
                        self.amplitude = self.max_amplitude;
                        self.state = EnvelopeState::Decay;
                    }
                    Some(curve) => {
                        let out = self.amplitude;
                        self.amplitude = curve.step(self.amplitude);
                        if self.amplitude >= self.max_amplitude {
                            self.amplitude = self.max_amplitude;
                            self.state = EnvelopeState::Decay;
                        }
                        return out;
                    }
                },

                EnvelopeState::Decay => match self.decay {
                    None => {
                        self.amplitude = self.sustain_level;
                        self.state = EnvelopeState::Sustain;
                    }
                    Some(curve) => {
                        if self.amplitude <= self.sustain_level {
                            self.amplitude = self.sustain_level;
                            self.state = EnvelopeState::Sustain;
                            continue;
                        }
                        let out = self.amplitude;
                        self.amplitude = curve.step(self.amplitude);
                        if self.amplitude <= self.sustain_level {
                            self.amplitude = self.sustain_level;
                            self.state = EnvelopeState::Sustain;
                        }
                        return out;
                    }
                },

                EnvelopeState::Sustain => {
                    self.amplitude = self.sustain_level;
                    return self.amplitude;
                }

                EnvelopeState::Release => {
                    let Some(curve) = self.release else {
                        return 0.0;
                    };
                    if self.amplitude <= 0.0 {
                        return 0.0;
                    }
                    let out = self.amplitude;
                    self.amplitude = curve.step(self.amplitude).max(0.0);
                    return out;
                }
            }
        }
    }

    /// Fill `levels` with per-sample amplitudes.
    pub fn render(&mut self, levels: &mut [f32]) {
        if self.is_finished() {
            levels.fill(0.0);
            return;
        }
        for level in levels.iter_mut() {
            *level = self.next_sample();
        }
    }

    /// Released and fully silent; every further sample is zero.
    pub fn is_finished(&self) -> bool {
        self.state == EnvelopeState::Release && self.amplitude <= 0.0
    }

    pub fn level(&self) -> f32 {
        self.amplitude
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    pub fn max_amplitude(&self) -> f32 {
        self.max_amplitude
    }

    pub fn sustain_level(&self) -> f32 {
        self.sustain_level
    }
}
