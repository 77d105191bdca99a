//! fm-synth - play the FM synth from the computer keyboard
//!
//! Run with: cargo run --features device --bin fm-synth
//!
//!   a s d f g h j k   toggle notes C4 to C5
//!   1 2 3 4           parallel, stack, square, 3to1
//!   t                 toggle tremolo
//!   l                 toggle 1.2 kHz low pass
//!   + -               volume
//!   space             stop / resume
//!   q, Esc            quit

use std::{collections::HashSet, time::Duration};

use color_eyre::eyre::{eyre, Result as EyreResult};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal,
};
use fm_synth::{
    io::device::AudioDevice, Algorithm, EngineConfig, EnvelopeParams, OscillatorConfig,
    synth::message::SynthHandle, PassFilterConfig, Patch, StreamState, Synth, OSCILLATOR_COUNT,
};

const BLOCK_SIZE: usize = 256;
const KEYS: [(char, f32); 8] = [
    ('a', 261.63),
    ('s', 293.66),
    ('d', 329.63),
    ('f', 349.23),
    ('g', 392.00),
    ('h', 440.00),
    ('j', 493.88),
    ('k', 523.25),
];

fn patch() -> EyreResult<Patch> {
    let envelope = EnvelopeParams::adsr(0.01, 0.2, 0.6, 0.4);
    let carrier = OscillatorConfig::default().envelope(envelope);
    let modulator = OscillatorConfig::default()
        .ratio(2.0)
        .amplitude(1.5)
        .envelope(envelope);

    let mut oscillators = [modulator; OSCILLATOR_COUNT];
    oscillators[OSCILLATOR_COUNT - 1] = carrier;
    Ok(Patch::new(oscillators, Algorithm::Stack)?)
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    env_logger::init();

    let device = AudioDevice::open_default(BLOCK_SIZE)?;
    let api = device.api();

    let stream = *api.lock().map_err(|_| eyre!("audio state poisoned"))?.config();
    let config = EngineConfig {
        sample_rate: stream.sample_rate,
        block_size: stream.block_size,
        channels: stream.channels,
        ..EngineConfig::default()
    };
    let (synth, mut handle) = Synth::with_handle(config, patch()?, 64)?;
    api.lock().map_err(|_| eyre!("audio state poisoned"))?.play(synth);

    println!("=== fm-synth ===");
    println!("Sample rate: {} Hz", config.sample_rate);
    println!("Channels: {}", config.channels);
    println!("Keys a-k play, 1-4 pick an algorithm, q quits");

    terminal::enable_raw_mode()?;
    let result = run(&device, &mut handle);
    terminal::disable_raw_mode()?;
    result
}

fn run(device: &AudioDevice, handle: &mut SynthHandle) -> EyreResult<()> {
    let api = device.api();
    let mut held: HashSet<char> = HashSet::new();
    let mut tremolo = false;
    let mut low_pass = false;

    loop {
        device.poll_halt()?;

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Char(c @ '1'..='4') => {
                let name = ["parallel", "stack", "square", "3to1"][c as usize - '1' as usize];
                handle.choose_algorithm(name)?;
            }
            KeyCode::Char('t') => {
                tremolo = !tremolo;
                let modulator = OscillatorConfig::default().fixed(5.0).amplitude(0.4);
                handle.set_am_modulator(tremolo.then_some(modulator))?;
            }
            KeyCode::Char('l') => {
                low_pass = !low_pass;
                handle.set_pass_filter(low_pass.then(|| PassFilterConfig::lowpass(1_200.0)))?;
            }
            KeyCode::Char('+') | KeyCode::Char('-') => {
                let mut api = api.lock().map_err(|_| eyre!("audio state poisoned"))?;
                let step = if key.code == KeyCode::Char('+') { 10.0 } else { -10.0 };
                let volume = (api.volume() + step).clamp(0.0, 100.0);
                api.set_volume(volume)?;
            }
            KeyCode::Char(' ') => {
                let mut api = api.lock().map_err(|_| eyre!("audio state poisoned"))?;
                if api.state() == StreamState::Streaming {
                    api.stop();
                } else {
                    api.resume();
                }
            }
            KeyCode::Char(c) => {
                let Some(&(_, frequency)) = KEYS.iter().find(|(k, _)| *k == c) else {
                    continue;
                };
                if held.remove(&c) {
                    handle.note_off(frequency)?;
                } else {
                    held.insert(c);
                    handle.note_on(frequency)?;
                }
            }
            _ => {}
        }
    }
}
