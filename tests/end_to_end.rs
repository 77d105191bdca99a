use approx::assert_abs_diff_eq;
use fm_synth::{
    Algorithm, AudioApi, EngineConfig, EnvelopeParams, EvictionPolicy, OscillatorConfig,
    PassFilterConfig, Patch, ReleaseMode, StreamConfig, Synth, OSCILLATOR_COUNT,
};

const BLOCK: usize = 256;

fn config() -> EngineConfig {
    EngineConfig {
        block_size: BLOCK,
        ..EngineConfig::default()
    }
}

/// Sines fixed at 440/0/0/0 Hz, all four heard in parallel.
fn fixed_sines(envelope: EnvelopeParams) -> Patch {
    let mut oscillators = [OscillatorConfig::default().fixed(0.0).envelope(envelope); OSCILLATOR_COUNT];
    oscillators[0] = oscillators[0].fixed(440.0);
    Patch::new(oscillators, Algorithm::Parallel).unwrap()
}

fn peak(block: &[f32]) -> f32 {
    block.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

fn render_blocks(synth: &mut Synth, blocks: usize) -> Vec<Vec<f32>> {
    (0..blocks)
        .map(|_| {
            let mut block = vec![0.0f32; BLOCK];
            synth.render(&mut block);
            block
        })
        .collect()
}

#[test]
fn attack_rises_from_silence_across_blocks() {
    let mut synth = Synth::new(config(), fixed_sines(EnvelopeParams::adsr(0.05, 0.1, 0.7, 0.3))).unwrap();
    synth.note_on(440.0).unwrap();

    let blocks = render_blocks(&mut synth, 3);
    assert_eq!(blocks[0][0], 0.0);
    let peaks: Vec<f32> = blocks.iter().map(|b| peak(b)).collect();
    assert!(peaks[0] > 0.0);
    assert!(peaks[0] < peaks[1] && peaks[1] < peaks[2], "{peaks:?}");
    // four carriers share a normalised mix
    assert!(peaks[2] < 0.25);
}

#[test]
fn zero_attack_starts_at_full_level() {
    let mut synth = Synth::new(config(), fixed_sines(EnvelopeParams::adsr(0.0, 0.1, 1.0, 0.3))).unwrap();
    synth.note_on(440.0).unwrap();

    for block in render_blocks(&mut synth, 3) {
        assert_abs_diff_eq!(peak(&block), 0.25, epsilon = 1e-3);
    }
}

#[test]
fn half_volume_is_half_the_signal() {
    let stream = StreamConfig::from(config());
    let envelope = EnvelopeParams::adsr(0.01, 0.1, 0.8, 0.3);

    let mut apis: Vec<AudioApi> = [100.0, 50.0]
        .into_iter()
        .map(|volume| {
            let mut synth = Synth::new(config(), fixed_sines(envelope)).unwrap();
            synth.note_on(440.0).unwrap();
            let mut api = AudioApi::new(stream).unwrap();
            api.set_volume(volume).unwrap();
            api.play(synth);
            api
        })
        .collect();

    for _ in 0..4 {
        let mut full = vec![0.0f32; BLOCK];
        let mut half = vec![0.0f32; BLOCK];
        apis[0].callback(&mut full);
        apis[1].callback(&mut half);
        assert!(full.iter().any(|&s| s != 0.0));
        for (f, h) in full.iter().zip(&half) {
            assert_eq!(f * 0.5, *h);
        }
    }
}

#[test]
fn idle_stream_writes_silence_on_every_channel() {
    for channels in [1, 2, 6] {
        let mut api = AudioApi::new(StreamConfig {
            channels,
            ..StreamConfig::from(config())
        })
        .unwrap();
        let mut out = vec![0.5f32; BLOCK * channels];
        api.callback(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}

#[test]
fn synth_without_voices_is_silent() {
    let mut synth = Synth::new(config(), fixed_sines(EnvelopeParams::default())).unwrap();
    for block in render_blocks(&mut synth, 2) {
        assert!(block.iter().all(|&s| s == 0.0));
    }
}

#[test]
fn voice_mix_stays_within_unit_range() {
    let envelope = EnvelopeParams::adsr(0.0, 0.1, 1.0, 0.3);
    let patch = Patch::new([OscillatorConfig::default().envelope(envelope); OSCILLATOR_COUNT], Algorithm::Parallel)
        .unwrap();
    let mut synth = Synth::new(config(), patch).unwrap();
    for frequency in [220.0, 330.0, 440.0, 550.0, 660.0, 770.0, 880.0, 990.0] {
        synth.note_on(frequency).unwrap();
    }
    assert_eq!(synth.voice_count(), 8);

    for block in render_blocks(&mut synth, 8) {
        assert!(peak(&block) <= 1.0 + 1e-6);
    }
}

#[test]
fn algorithms_leave_expected_carriers() {
    let oscillators = [OscillatorConfig::default(); OSCILLATOR_COUNT];
    let cases = [
        (Algorithm::Parallel, vec![0, 1, 2, 3]),
        (Algorithm::Stack, vec![3]),
        (Algorithm::Square, vec![1, 3]),
        (Algorithm::ThreeToOne, vec![3]),
    ];
    for (algorithm, carriers) in cases {
        let patch = Patch::new(oscillators, algorithm).unwrap();
        assert_eq!(patch.carriers(), carriers, "{algorithm}");
    }
}

#[test]
fn disabled_destination_turns_modulator_into_carrier() {
    let mut oscillators = [OscillatorConfig::default(); OSCILLATOR_COUNT];
    oscillators[1] = oscillators[1].disabled(true);
    let patch = Patch::new(oscillators, Algorithm::Square).unwrap();
    assert_eq!(patch.carriers(), vec![0, 3]);
}

#[test]
fn filtered_output_does_not_depend_on_block_split() {
    let envelope = EnvelopeParams::adsr(0.01, 0.1, 0.8, 0.3);
    let patch = Patch::new([OscillatorConfig::default().envelope(envelope); OSCILLATOR_COUNT], Algorithm::Stack)
        .unwrap();

    let mut whole = Synth::new(config(), patch.clone()).unwrap();
    let mut split = Synth::new(config(), patch).unwrap();
    for synth in [&mut whole, &mut split] {
        synth.set_pass_filter(Some(PassFilterConfig::lowpass(1_000.0))).unwrap();
        synth.note_on(220.0).unwrap();
    }

    let mut expected = vec![0.0f32; BLOCK * 2];
    whole.render(&mut expected);

    let mut actual = vec![0.0f32; BLOCK * 2];
    let (first, second) = actual.split_at_mut(BLOCK);
    split.render(first);
    split.render(second);

    for (a, e) in actual.iter().zip(&expected) {
        assert_abs_diff_eq!(a, e, epsilon = 1e-6);
    }
}

#[test]
fn truncate_silences_released_voice_immediately() {
    let mut synth = Synth::new(config(), fixed_sines(EnvelopeParams::adsr(0.0, 0.1, 1.0, 0.05))).unwrap();
    synth.note_on(440.0).unwrap();
    render_blocks(&mut synth, 1);

    synth.note_off(440.0);
    assert_eq!(synth.voice_count(), 0);
    let blocks = render_blocks(&mut synth, 1);
    assert!(blocks[0].iter().all(|&s| s == 0.0));
}

#[test]
fn ring_out_plays_release_tail_then_drops_voice() {
    let config = EngineConfig {
        release_mode: ReleaseMode::RingOut,
        ..config()
    };
    let mut synth = Synth::new(config, fixed_sines(EnvelopeParams::adsr(0.0, 0.1, 1.0, 0.05))).unwrap();
    synth.note_on(440.0).unwrap();
    render_blocks(&mut synth, 1);

    synth.note_off(440.0);
    assert_eq!(synth.voice_count(), 1);
    let tail = render_blocks(&mut synth, 1);
    assert!(peak(&tail[0]) > 0.0);

    let mut blocks = 0;
    while synth.voice_count() > 0 && blocks < 400 {
        render_blocks(&mut synth, 1);
        blocks += 1;
    }
    assert_eq!(synth.voice_count(), 0);
}

#[test]
fn eviction_policy_picks_the_dropped_voice() {
    let cases = [
        (EvictionPolicy::Newest, vec![220.0, 440.0]),
        (EvictionPolicy::Oldest, vec![330.0, 440.0]),
    ];
    for (eviction, expected) in cases {
        let config = EngineConfig {
            max_voices: 2,
            eviction,
            ..config()
        };
        let mut synth = Synth::new(config, fixed_sines(EnvelopeParams::default())).unwrap();
        for frequency in [220.0, 330.0, 440.0] {
            synth.note_on(frequency).unwrap();
        }
        let sounding: Vec<f32> = synth.voices().iter().map(|v| v.frequency()).collect();
        assert_eq!(sounding, expected, "{eviction:?}");
    }
}
