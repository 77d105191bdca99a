//! Composable building blocks for constructing audio-processing graphs.
//!
//! Graph nodes wrap the low-level DSP primitives with what an FM voice
//! needs: note events, dual-mode (phase or audible) output and block-based
//! rendering. The `extensions` module adds fluent helpers so graphs can be
//! built with a chainable API.

/// Tremolo in the `signal × (1 + modulator)` form.
pub mod amplify;
/// One operator: an oscillator shaped by its own ADSR envelope.
pub mod envelope;
/// Fluent combinators (`.freq_modulate()`, `.amp_modulate()`, `.through()`).
pub mod extensions;
/// Butterworth low/high pass stage with persistent state.
pub mod filter;
/// Normalised summing of N parallel sources.
pub mod mix;
/// Frequency modulation with raw-phase passthrough for chaining.
pub mod modulate;
/// Core traits shared by all graph nodes.
pub mod node;
/// Audio-band oscillators and noise.
pub mod oscillator;
/// Serial chaining of two nodes (source → effect).
pub mod through;
