//! Real-world scenario benchmarks.
//!
//! These benchmarks model actual usage patterns: one voice per FM
//! algorithm, and a full synth with every voice slot sounding.

mod voices;

pub use voices::bench_voices;
