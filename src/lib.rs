pub mod config;
pub mod dsp;
pub mod error;
pub mod graph; // Composable audio graph nodes
pub mod io; // Realtime delivery boundary
pub mod synth; // Voices, FM routing and polyphony

pub use config::{EngineConfig, EvictionPolicy, ReleaseMode};
pub use error::{Error, Result};
pub use io::audio::{
    AudioApi, BlockSource, CallbackStatus, GraphSource, StreamConfig, StreamEvent, StreamState,
};
pub use synth::{
    patch::{Algorithm, EnvelopeParams, OscillatorConfig, Patch, PassFilterConfig},
    poly::Synth,
};

pub const MAX_BLOCK_SIZE: usize = 2048;

/// Number of operators in a patch.
pub const OSCILLATOR_COUNT: usize = 4;
