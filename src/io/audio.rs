#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, RingBuffer};

use crate::{
    config::EngineConfig,
    error::{Error, Result},
    graph::node::{GraphNode, RenderCtx},
    MAX_BLOCK_SIZE,
};

/*
Real-Time Boundary
==================

    ┌──────┐  play   ┌───────────┐  stop   ┌─────────┐
    │ Idle │ ──────→ │ Streaming │ ──────→ │ Stopped │
    └──────┘         └───────────┘ ←────── └─────────┘
        ↑                  │        resume
        └── end of stream ─┘

The device calls `callback` once per period with an interleaved buffer.
Streaming pulls one mono block from the source, scales it by volume/100
and copies it to every channel. Idle and Stopped write silence; so does
a Streaming callback whose source has nothing left, which also halts the
stream and returns it to Idle.

Nothing in `callback` allocates, blocks or returns an error.

Stopping keeps the source and all of its state, so resuming continues
exactly where playback stopped.
*/

/// A pull-based mono block producer.
pub trait BlockSource: Send {
    /// Fill `out` with the next block. `false` marks the end of the stream;
    /// `out` is then ignored.
    fn next_block(&mut self, out: &mut [f32]) -> bool;
}

/// Feeds a graph node to [`AudioApi`], optionally for a limited number of blocks.
///
/// [`Synth`](crate::Synth) is the usual source; this adapter plays any
/// [`GraphNode`] directly, e.g. a single operator or a filtered oscillator
/// built with [`NodeExt`](crate::graph::extensions::NodeExt).
pub struct GraphSource<N> {
    node: N,
    ctx: RenderCtx,
    remaining: Option<usize>,
}

impl<N: GraphNode> GraphSource<N> {
    pub fn new(node: N, ctx: RenderCtx) -> Self {
        Self {
            node,
            ctx,
            remaining: None,
        }
    }

    /// End the stream after `blocks` pulls.
    pub fn take_blocks(mut self, blocks: usize) -> Self {
        self.remaining = Some(blocks);
        self
    }
}

impl<N: GraphNode> BlockSource for GraphSource<N> {
    fn next_block(&mut self, out: &mut [f32]) -> bool {
        match self.remaining.as_mut() {
            Some(0) => return false,
            Some(n) => *n -= 1,
            None => {}
        }
        self.node.render_block(out, &self.ctx);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConfig {
    pub sample_rate: f32,
    pub channels: usize,
    /// Frames per block.
    pub block_size: usize,
}

impl StreamConfig {
    pub fn validate(&self) -> Result<()> {
        EngineConfig::from(*self).validate()
    }
}

impl From<EngineConfig> for StreamConfig {
    fn from(config: EngineConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            block_size: config.block_size,
        }
    }
}

impl From<StreamConfig> for EngineConfig {
    fn from(config: StreamConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            block_size: config.block_size,
            ..EngineConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    Continue,
    /// The source ended; the device stream should be halted.
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    Started,
    Stopped,
    Finished,
}

pub struct AudioApi {
    config: StreamConfig,
    source: Option<Box<dyn BlockSource>>,
    state: StreamState,
    volume: f32,
    block: Vec<f32>,
    #[cfg(feature = "rtrb")]
    events: Option<Producer<StreamEvent>>,
}

impl AudioApi {
    pub fn new(config: StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source: None,
            state: StreamState::Idle,
            volume: 100.0,
            block: vec![0.0; MAX_BLOCK_SIZE],
            #[cfg(feature = "rtrb")]
            events: None,
        })
    }

    /// Also return a queue on which stream state changes are reported.
    #[cfg(feature = "rtrb")]
    pub fn with_events(config: StreamConfig, capacity: usize) -> Result<(Self, Consumer<StreamEvent>)> {
        let (tx, rx) = RingBuffer::new(capacity);
        let mut api = Self::new(config)?;
        api.events = Some(tx);
        Ok((api, rx))
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !(0.0..=100.0).contains(&volume) {
            return Err(Error::Volume(volume));
        }
        self.volume = volume;
        Ok(())
    }

    /// Assign `source` and start streaming it, replacing any previous source.
    pub fn play(&mut self, source: impl BlockSource + 'static) {
        self.source = Some(Box::new(source));
        self.state = StreamState::Streaming;
        log::info!("stream started");
        self.emit(StreamEvent::Started);
    }

    /// Halt delivery; the source keeps its state for [`AudioApi::resume`].
    pub fn stop(&mut self) {
        if self.state == StreamState::Streaming {
            self.state = StreamState::Stopped;
            log::info!("stream stopped");
            self.emit(StreamEvent::Stopped);
        }
    }

    /// Continue a stopped stream. Returns `false` when there is nothing to resume.
    pub fn resume(&mut self) -> bool {
        if self.state != StreamState::Stopped || self.source.is_none() {
            return false;
        }
        self.state = StreamState::Streaming;
        self.emit(StreamEvent::Started);
        true
    }

    /// Fill one interleaved device buffer.
    pub fn callback(&mut self, out: &mut [f32]) -> CallbackStatus {
        let channels = self.config.channels;
        let Some(source) = self.source.as_mut().filter(|_| self.state == StreamState::Streaming) else {
            out.fill(0.0);
            return CallbackStatus::Continue;
        };

        let gain = self.volume / 100.0;
        let block_samples = self.config.block_size * channels;
        for chunk in out.chunks_mut(block_samples) {
            let frames = chunk.len() / channels;
            // samples that do not fill a whole frame stay silent
            let (chunk, partial) = chunk.split_at_mut(frames * channels);
            partial.fill(0.0);
            if frames == 0 {
                continue;
            }
            let block = &mut self.block[..frames];

            if !source.next_block(block) {
                out.fill(0.0);
                self.finish();
                return CallbackStatus::Halt;
            }

            for (frame, &sample) in chunk.chunks_mut(channels).zip(block.iter()) {
                frame.fill(sample * gain);
            }
        }
        CallbackStatus::Continue
    }

    fn finish(&mut self) {
        self.source = None;
        self.state = StreamState::Idle;
        log::warn!("source ended, stream halted");
        self.emit(StreamEvent::Finished);
    }

    #[cfg(feature = "rtrb")]
    fn emit(&mut self, event: StreamEvent) {
        if let Some(events) = self.events.as_mut() {
            // A full queue drops the event; the state itself is still correct
            let _ = events.push(event);
        }
    }

    #[cfg(not(feature = "rtrb"))]
    fn emit(&mut self, _event: StreamEvent) {}
}
