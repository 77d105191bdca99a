//! Engine-wide configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{error::Error, Result, MAX_BLOCK_SIZE};

/// Which voice is dropped when a note arrives and every voice slot is taken.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Drop the most recently started voice.
    #[default]
    Newest,
    /// Drop the voice that has been sounding longest.
    Oldest,
}

/// What happens to a voice on note-off.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseMode {
    /// Envelopes enter release and the voice leaves the mix at once,
    /// so the release tail is never heard.
    #[default]
    Truncate,
    /// The voice stays in the mix until every envelope has released to silence.
    RingOut,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Frames per block; the unit of every pull.
    pub block_size: usize,
    /// Output channels; the mono mix is broadcast to each.
    pub channels: usize,
    pub max_voices: usize,
    pub eviction: EvictionPolicy,
    pub release_mode: ReleaseMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 256,
            channels: 1,
            max_voices: 8,
            eviction: EvictionPolicy::default(),
            release_mode: ReleaseMode::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(Error::InvalidConfig(format!(
                "block size must be in 1..={MAX_BLOCK_SIZE}, got {}",
                self.block_size
            )));
        }
        if self.channels == 0 {
            return Err(Error::InvalidConfig("at least one output channel is required".into()));
        }
        if self.max_voices == 0 {
            return Err(Error::InvalidConfig("max_voices must be at least 1".into()));
        }
        Ok(())
    }

    /// Playback time of one block in seconds; the callback deadline.
    pub fn block_duration(&self) -> f32 {
        self.block_size as f32 / self.sample_rate
    }
}
