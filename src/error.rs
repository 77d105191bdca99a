//! Error types for fm_synth.
//!
//! Errors only ever surface at the configuration boundary. The render path
//! converts every failure into silence or a stream halt.

use thiserror::Error;

/// Result type alias for fm_synth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring the synthesizer.
#[derive(Debug, Error)]
pub enum Error {
    /// The algorithm name is not one of the known topologies.
    #[error("unknown algorithm '{0}' (expected parallel, stack, square, 3to1 or custom)")]
    UnknownAlgorithm(String),

    /// The waveform name does not match a known waveform.
    #[error("unknown waveform '{0}'")]
    UnknownWaveform(String),

    /// The filter type name is neither low nor high pass.
    #[error("unknown filter type '{0}' (expected low or high)")]
    UnknownFilterType(String),

    /// An oscillator index outside the patch.
    #[error("oscillator index {index} out of range (patch has {count} oscillators)")]
    OscillatorIndex { index: usize, count: usize },

    /// An FM destination that does not point to a later oscillator.
    #[error("oscillator {from} cannot modulate oscillator {to}: destinations must be later oscillators")]
    InvalidDestination { from: usize, to: usize },

    /// Envelope parameters that would feed the rate derivation a bad logarithm.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(&'static str),

    /// A frequency, ratio, amplitude or cutoff outside its valid range.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    /// Stream or engine configuration that cannot be realised.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Volume must lie in 0..=100.
    #[error("volume {0} out of range 0..=100")]
    Volume(f32),

    /// The control queue towards the audio thread is full.
    #[error("control queue full, message dropped")]
    QueueFull,

    /// Audio backend failure (device lookup, stream creation, playback).
    #[cfg(feature = "device")]
    #[error("audio device error: {0}")]
    Device(String),
}
