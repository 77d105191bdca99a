//! Low-level DSP primitives used by the higher level graph nodes.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside voice structs. They stay focused on the
//! signal-processing math so graph combinators can layer on routing and
//! modulation.

/// Exponential attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Third-order Butterworth low/high pass with persistent state.
pub mod filter;
/// Phase accumulator and waveform evaluation.
pub mod oscillator;

pub use envelope::{EnvelopeParams, EnvelopeState};
pub use filter::FilterType;
pub use oscillator::OscillatorWaveform;
