use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use crate::dsp::envelope::EnvelopeParams;
use crate::{
    dsp::{filter::FilterType, oscillator::OscillatorWaveform},
    error::{Error, Result},
    graph::{envelope::EnvNode, node::RenderCtx, oscillator::OscNode},
    synth::{
        factory::VoiceFactory,
        operators::FmGraph,
        routing::{Destinations, Routing},
        voice::Voice,
    },
    OSCILLATOR_COUNT,
};

/// Named FM topologies over the four operators.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Four independent carriers.
    #[default]
    Parallel,
    /// 0 → 1 → 2 → 3, one carrier.
    Stack,
    /// 0 → 1 and 2 → 3, two carriers.
    Square,
    /// 0, 1 and 2 all modulate 3, one carrier.
    ThreeToOne,
    /// Destinations set per operator.
    Custom,
}

impl Algorithm {
    /// Preset destinations of operator `index`; `None` for `Custom`.
    pub fn destinations(self, index: usize) -> Option<Destinations> {
        let last = OSCILLATOR_COUNT - 1;
        let routes = match self {
            Algorithm::Parallel => Destinations::NONE,
            Algorithm::Stack if index < last => Destinations::single(index + 1),
            Algorithm::Stack => Destinations::NONE,
            Algorithm::Square if index % 2 == 0 => Destinations::single(index + 1),
            Algorithm::Square => Destinations::NONE,
            Algorithm::ThreeToOne if index < last => Destinations::single(last),
            Algorithm::ThreeToOne => Destinations::NONE,
            Algorithm::Custom => return None,
        };
        Some(routes)
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Parallel => "parallel",
            Algorithm::Stack => "stack",
            Algorithm::Square => "square",
            Algorithm::ThreeToOne => "3to1",
            Algorithm::Custom => "custom",
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "parallel" => Ok(Self::Parallel),
            "stack" => Ok(Self::Stack),
            "square" => Ok(Self::Square),
            "3to1" => Ok(Self::ThreeToOne),
            "custom" => Ok(Self::Custom),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Template for one operator. Every voice builds its own operator from it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorConfig {
    pub waveform: OscillatorWaveform,
    /// Hz, played when `fixed_frequency` is set.
    pub frequency: f32,
    /// Multiple of the note frequency, used when `fixed_frequency` is not set.
    pub ratio: f32,
    /// Peak amplitude. For a modulator this is the modulation index in radians.
    pub amplitude: f32,
    pub envelope: EnvelopeParams,
    pub fixed_frequency: bool,
    pub disabled: bool,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            waveform: OscillatorWaveform::Sine,
            frequency: 440.0,
            ratio: 1.0,
            amplitude: 1.0,
            envelope: EnvelopeParams::default(),
            fixed_frequency: false,
            disabled: false,
        }
    }
}

impl OscillatorConfig {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self {
            waveform,
            ..Self::default()
        }
    }

    /// Play `frequency` Hz whatever the note.
    pub fn fixed(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self.fixed_frequency = true;
        self
    }

    pub fn ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self.fixed_frequency = false;
        self
    }

    pub fn amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn envelope(mut self, envelope: EnvelopeParams) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.frequency.is_finite() && self.frequency >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "frequency",
                value: self.frequency,
            });
        }
        if !(self.ratio.is_finite() && self.ratio > 0.0) {
            return Err(Error::InvalidParameter {
                name: "ratio",
                value: self.ratio,
            });
        }
        if !(self.amplitude.is_finite() && self.amplitude >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "amplitude",
                value: self.amplitude,
            });
        }
        self.envelope.validate()
    }

    fn oscillator(&self) -> OscNode {
        let osc = OscNode::new(self.waveform).with_amplitude(self.amplitude);
        if self.fixed_frequency {
            osc.with_frequency(self.frequency)
        } else {
            osc.with_ratio(self.ratio)
        }
    }

    /// Fresh operator with its own phase and envelope state.
    pub fn operator(&self, sample_rate: f32) -> EnvNode {
        EnvNode::new(self.oscillator(), self.envelope, sample_rate)
    }

    /// Turn an existing operator into a fresh one from this template,
    /// reusing its buffers.
    pub fn configure(&self, operator: &mut EnvNode, sample_rate: f32) {
        operator.reset(self.oscillator(), self.envelope, sample_rate);
    }

    /// Free-running oscillator at `frequency`, without an envelope
    /// (tremolo source).
    pub fn free_running(&self) -> OscNode {
        OscNode::new(self.waveform)
            .with_amplitude(self.amplitude)
            .with_frequency(self.frequency)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassFilterConfig {
    pub filter_type: FilterType,
    pub cutoff_hz: f32,
}

impl PassFilterConfig {
    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self {
            filter_type: FilterType::LowPass,
            cutoff_hz,
        }
    }

    pub fn highpass(cutoff_hz: f32) -> Self {
        Self {
            filter_type: FilterType::HighPass,
            cutoff_hz,
        }
    }

    /// Cutoff must lie strictly between 0 Hz and Nyquist.
    pub fn validate(&self, sample_rate: f32) -> Result<()> {
        let nyquist = sample_rate / 2.0;
        if !(self.cutoff_hz.is_finite() && self.cutoff_hz > 0.0 && self.cutoff_hz < nyquist) {
            return Err(Error::InvalidParameter {
                name: "cutoff",
                value: self.cutoff_hz,
            });
        }
        Ok(())
    }
}

/// The four operator templates plus their FM routing.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    oscillators: [OscillatorConfig; OSCILLATOR_COUNT],
    routes: [Destinations; OSCILLATOR_COUNT],
    algorithm: Algorithm,
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            oscillators: [OscillatorConfig::default(); OSCILLATOR_COUNT],
            routes: [Destinations::NONE; OSCILLATOR_COUNT],
            algorithm: Algorithm::Parallel,
        }
    }
}

impl Patch {
    pub fn new(oscillators: [OscillatorConfig; OSCILLATOR_COUNT], algorithm: Algorithm) -> Result<Self> {
        for osc in &oscillators {
            osc.validate()?;
        }
        let mut patch = Self {
            oscillators,
            ..Self::default()
        };
        patch.set_algorithm(algorithm);
        Ok(patch)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Apply a preset topology. Re-applying the same preset changes nothing;
    /// `Custom` keeps the current destinations.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        for (index, routes) in self.routes.iter_mut().enumerate() {
            if let Some(preset) = algorithm.destinations(index) {
                *routes = preset;
            }
        }
        self.algorithm = algorithm;
    }

    /// Set one operator's destinations directly; switches to `Custom`.
    pub fn set_destinations(&mut self, index: usize, targets: &[usize]) -> Result<()> {
        check_index(index)?;
        let routes = Destinations::new(index, targets)?;
        self.set_routes(index, routes)
    }

    /// Like [`Patch::set_destinations`] for an already built set.
    pub fn set_routes(&mut self, index: usize, routes: Destinations) -> Result<()> {
        check_index(index)?;
        if let Some(to) = routes.iter().find(|&to| to <= index) {
            return Err(Error::InvalidDestination { from: index, to });
        }
        self.routes[index] = routes;
        self.algorithm = Algorithm::Custom;
        Ok(())
    }

    pub fn destinations(&self, index: usize) -> Result<Destinations> {
        check_index(index)?;
        Ok(self.routes[index])
    }

    pub fn oscillator(&self, index: usize) -> Result<&OscillatorConfig> {
        check_index(index)?;
        Ok(&self.oscillators[index])
    }

    pub fn oscillators(&self) -> &[OscillatorConfig; OSCILLATOR_COUNT] {
        &self.oscillators
    }

    pub fn set_oscillator(&mut self, index: usize, config: OscillatorConfig) -> Result<()> {
        check_index(index)?;
        config.validate()?;
        self.oscillators[index] = config;
        Ok(())
    }

    pub fn routing(&self) -> Routing {
        Routing::new(self.routes)
    }

    pub fn enabled(&self) -> [bool; OSCILLATOR_COUNT] {
        std::array::from_fn(|i| !self.oscillators[i].disabled)
    }

    /// Operator indices heard directly under the current routing.
    pub fn carriers(&self) -> Vec<usize> {
        self.routing().carriers(self.enabled())
    }
}

impl VoiceFactory for Patch {
    type Voice = Voice;

    /// Disabled operators are built as well and stay parked in the voice.
    fn create_voice(&self, ctx: &RenderCtx) -> Voice {
        let operators = std::array::from_fn(|i| self.oscillators[i].operator(ctx.sample_rate));
        let graph = FmGraph::new(operators, &self.routing(), self.enabled());
        Voice::new(graph, *ctx)
    }
}

fn check_index(index: usize) -> Result<()> {
    if index >= OSCILLATOR_COUNT {
        return Err(Error::OscillatorIndex {
            index,
            count: OSCILLATOR_COUNT,
        });
    }
    Ok(())
}
