//! Benchmarks for low-level DSP primitives.

mod envelope;
mod filter;
mod modulate;
mod oscillator;

pub use envelope::bench_envelope;
pub use filter::bench_filter;
pub use modulate::bench_modulate;
pub use oscillator::bench_oscillator;
