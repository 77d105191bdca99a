#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

use crate::synth::{
    patch::{Algorithm, OscillatorConfig, PassFilterConfig},
    routing::Destinations,
};
#[cfg(feature = "rtrb")]
use crate::{
    error::{Error, Result},
    OSCILLATOR_COUNT,
};

/// Control change for the audio thread, applied between blocks.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn { frequency: f32 },
    NoteOff { frequency: f32 },
    AllNotesOff,
    SetAlgorithm(Algorithm),
    SetDestinations { index: usize, destinations: Destinations },
    SetOscillator { index: usize, config: OscillatorConfig },
    SetAmModulator(Option<OscillatorConfig>),
    SetPassFilter(Option<PassFilterConfig>),
    SetOutputFrequency(f32),
}

pub trait MessageReceiver: Send {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

/// Control-thread side of a [`crate::Synth`].
///
/// Every call is validated here, so only well-formed messages reach the
/// audio thread. A full queue is reported as [`Error::QueueFull`] and the
/// message is dropped.
#[cfg(feature = "rtrb")]
pub struct SynthHandle {
    tx: Producer<SynthMessage>,
    sample_rate: f32,
}

#[cfg(feature = "rtrb")]
impl SynthHandle {
    pub(crate) fn new(tx: Producer<SynthMessage>, sample_rate: f32) -> Self {
        Self { tx, sample_rate }
    }

    pub fn note_on(&mut self, frequency: f32) -> Result<()> {
        check_frequency(frequency)?;
        self.send(SynthMessage::NoteOn { frequency })
    }

    pub fn note_off(&mut self, frequency: f32) -> Result<()> {
        self.send(SynthMessage::NoteOff { frequency })
    }

    pub fn all_notes_off(&mut self) -> Result<()> {
        self.send(SynthMessage::AllNotesOff)
    }

    /// Select a topology by name: parallel, stack, square, 3to1 or custom.
    pub fn choose_algorithm(&mut self, name: &str) -> Result<()> {
        let algorithm = name.parse()?;
        self.set_algorithm(algorithm)
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) -> Result<()> {
        self.send(SynthMessage::SetAlgorithm(algorithm))
    }

    pub fn set_destinations(&mut self, index: usize, targets: &[usize]) -> Result<()> {
        check_index(index)?;
        let destinations = Destinations::new(index, targets)?;
        self.send(SynthMessage::SetDestinations {
            index,
            destinations,
        })
    }

    pub fn set_oscillator(&mut self, index: usize, config: OscillatorConfig) -> Result<()> {
        check_index(index)?;
        config.validate()?;
        self.send(SynthMessage::SetOscillator { index, config })
    }

    pub fn set_am_modulator(&mut self, modulator: Option<OscillatorConfig>) -> Result<()> {
        if let Some(config) = &modulator {
            config.validate()?;
        }
        self.send(SynthMessage::SetAmModulator(modulator))
    }

    pub fn set_pass_filter(&mut self, filter: Option<PassFilterConfig>) -> Result<()> {
        if let Some(config) = &filter {
            config.validate(self.sample_rate)?;
        }
        self.send(SynthMessage::SetPassFilter(filter))
    }

    pub fn set_output_frequency(&mut self, frequency: f32) -> Result<()> {
        check_frequency(frequency)?;
        self.send(SynthMessage::SetOutputFrequency(frequency))
    }

    fn send(&mut self, message: SynthMessage) -> Result<()> {
        self.tx.push(message).map_err(|_| Error::QueueFull)
    }
}

#[cfg(feature = "rtrb")]
fn check_index(index: usize) -> Result<()> {
    if index >= OSCILLATOR_COUNT {
        return Err(Error::OscillatorIndex {
            index,
            count: OSCILLATOR_COUNT,
        });
    }
    Ok(())
}

#[cfg(feature = "rtrb")]
fn check_frequency(frequency: f32) -> Result<()> {
    if !(frequency.is_finite() && frequency > 0.0) {
        return Err(Error::InvalidParameter {
            name: "frequency",
            value: frequency,
        });
    }
    Ok(())
}
