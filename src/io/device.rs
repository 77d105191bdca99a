use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::{
    error::{Error, Result},
    io::audio::{AudioApi, CallbackStatus, StreamConfig},
};

/// The default output device driving an [`AudioApi`].
///
/// The control side reaches the api through [`AudioDevice::api`]. The audio
/// callback only ever `try_lock`s it and plays silence while the control
/// side holds the lock.
pub struct AudioDevice {
    stream: cpal::Stream,
    api: Arc<Mutex<AudioApi>>,
    halted: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default output device at its own sample rate and channel
    /// count; `block_size` frames per callback is requested.
    pub fn open_default(block_size: usize) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Device("no default output device available".into()))?;
        let default = device
            .default_output_config()
            .map_err(|err| Error::Device(format!("failed to fetch default output config: {err}")))?;

        let config = StreamConfig {
            sample_rate: default.sample_rate().0 as f32,
            channels: default.channels() as usize,
            block_size,
        };
        let api = Arc::new(Mutex::new(AudioApi::new(config)?));
        let halted = Arc::new(AtomicBool::new(false));

        let mut stream_config: cpal::StreamConfig = default.into();
        stream_config.buffer_size = cpal::BufferSize::Fixed(block_size as u32);

        let api_clone = api.clone();
        let halted_clone = halted.clone();
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _| match api_clone.try_lock() {
                    Ok(mut api) => {
                        if api.callback(data) == CallbackStatus::Halt {
                            halted_clone.store(true, Ordering::Release);
                        }
                    }
                    Err(_) => data.fill(0.0),
                },
                |err| log::error!("audio stream error: {err}"),
                None,
            )
            .map_err(|err| Error::Device(format!("failed to build output stream: {err}")))?;

        stream
            .play()
            .map_err(|err| Error::Device(format!("failed to start output stream: {err}")))?;
        log::info!(
            "opened output device: {} Hz, {} channels, {} frames per block",
            config.sample_rate,
            config.channels,
            config.block_size
        );

        Ok(Self { stream, api, halted })
    }

    pub fn api(&self) -> Arc<Mutex<AudioApi>> {
        self.api.clone()
    }

    /// Pause the device stream once the source has ended. Call from the
    /// control side; returns `true` if the stream was paused.
    pub fn poll_halt(&self) -> Result<bool> {
        if !self.halted.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        self.stream
            .pause()
            .map_err(|err| Error::Device(format!("failed to pause output stream: {err}")))?;
        Ok(true)
    }

    pub fn restart(&self) -> Result<()> {
        self.stream
            .play()
            .map_err(|err| Error::Device(format!("failed to start output stream: {err}")))
    }
}
