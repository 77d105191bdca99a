#[cfg(feature = "rtrb")]
use rtrb::RingBuffer;

#[cfg(feature = "rtrb")]
use crate::synth::message::SynthHandle;
use crate::{
    config::{EngineConfig, EvictionPolicy, ReleaseMode},
    error::{Error, Result},
    graph::{
        amplify::AmpModulation,
        filter::PassFilter,
        mix::Sum,
        node::{GraphNode, RenderCtx},
        oscillator::OscNode,
        through::Through,
    },
    io::audio::BlockSource,
    synth::{
        factory::VoiceFactory,
        message::{MessageReceiver, SynthMessage},
        patch::{Algorithm, OscillatorConfig, PassFilterConfig, Patch},
        voice::{Voice, VoiceState},
    },
    MAX_BLOCK_SIZE,
};

/*
Polyphonic FM Synth
===================

    voice ─┐
    voice ─┼─→ Sum (normalised) ─→ tremolo ─→ pass filter ─→ out
    voice ─┘

The synth owns a pool of `max_voices` voice slots, built once up front.
A note-on takes an idle slot and rebuilds it in place from the patch, so
voices never share phase or envelope state and nothing is allocated or
freed per note. When every slot is sounding a voice is evicted first:

  - a voice that is already releasing (ring-out mode only), oldest first
  - otherwise the newest or the oldest voice, per `EvictionPolicy`

Note-off puts the voice's envelopes into release. In `Truncate` mode the
slot goes idle straight away and its release tail is never heard; in
`RingOut` mode it sounds until every carrier envelope is silent.

Routing changes (algorithm, destinations, operator edits, tremolo) are
applied to every sounding voice as well as to future ones.

Changes arriving through the message queue are applied at the top of the
next block, never in the middle of one. That path runs on the audio thread:
it does not log, and failed messages are only counted.
*/

pub struct Synth {
    config: EngineConfig,
    patch: Patch,
    output: Through<AmpModulation<Sum<Voice>, OscNode>, Option<PassFilter>>,
    rx: Option<Box<dyn MessageReceiver>>,
    next_age: u64,
    rejected: u64,
}

impl Synth {
    pub fn new(config: EngineConfig, patch: Patch) -> Result<Self> {
        config.validate()?;
        let template = RenderCtx::from_freq(config.sample_rate, 440.0);
        let pool = (0..config.max_voices)
            .map(|_| patch.create_voice(&template))
            .collect();

        Ok(Self {
            config,
            patch,
            output: Through::new(AmpModulation::bypass(Sum::normalised(pool)), None),
            rx: None,
            next_age: 0,
            rejected: 0,
        })
    }

    /// Build a synth fed by a lock-free queue, plus the handle that writes it.
    #[cfg(feature = "rtrb")]
    pub fn with_handle(config: EngineConfig, patch: Patch, capacity: usize) -> Result<(Self, SynthHandle)> {
        let (tx, rx) = RingBuffer::<SynthMessage>::new(capacity);
        let synth = Self::new(config, patch)?.with_receiver(rx);
        Ok((synth, SynthHandle::new(tx, config.sample_rate)))
    }

    pub fn with_receiver(mut self, rx: impl MessageReceiver + 'static) -> Self {
        self.rx = Some(Box::new(rx));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// Sounding voices, oldest first.
    pub fn voices(&self) -> Vec<&Voice> {
        let mut voices: Vec<&Voice> = self.pool().iter().filter(|v| !v.is_idle()).collect();
        voices.sort_by_key(|v| v.age());
        voices
    }

    pub fn voice_count(&self) -> usize {
        self.pool().iter().filter(|v| !v.is_idle()).count()
    }

    /// Queued messages dropped because they failed validation.
    pub fn rejected_messages(&self) -> u64 {
        self.rejected
    }

    fn pool(&self) -> &[Voice] {
        self.output.source().signal().sources()
    }

    fn pool_mut(&mut self) -> &mut [Voice] {
        self.output.source_mut().signal_mut().sources_mut()
    }

    pub fn note_on(&mut self, frequency: f32) -> Result<()> {
        if let Some(evicted) = self.start_note(frequency)? {
            log::debug!("evicted voice at {evicted} Hz");
        }
        log::debug!("note on {frequency} Hz ({} voices)", self.voice_count());
        Ok(())
    }

    /// Start a note in a free slot, evicting one if needed. Returns the
    /// frequency of the evicted voice.
    fn start_note(&mut self, frequency: f32) -> Result<Option<f32>> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(Error::InvalidParameter {
                name: "frequency",
                value: frequency,
            });
        }

        let (slot, evicted) = match self.pool().iter().position(Voice::is_idle) {
            Some(slot) => (slot, None),
            None => {
                let Some(slot) = self.victim() else {
                    return Ok(None);
                };
                (slot, Some(self.pool()[slot].frequency()))
            }
        };

        let ctx = RenderCtx::from_freq(self.config.sample_rate, frequency);
        let age = self.next_age;
        self.next_age += 1;

        let Self { patch, output, .. } = self;
        let voice = &mut output.source_mut().signal_mut().sources_mut()[slot];
        voice.assign(patch, ctx);
        voice.start(age);
        Ok(evicted)
    }

    fn victim(&self) -> Option<usize> {
        let voices = self.pool().iter().enumerate();
        let releasing = voices
            .clone()
            .filter(|(_, v)| v.state() == VoiceState::Releasing)
            .min_by_key(|(_, v)| v.age())
            .map(|(i, _)| i);

        releasing.or_else(|| {
            let chosen = match self.config.eviction {
                EvictionPolicy::Newest => voices.max_by_key(|(_, v)| v.age()),
                EvictionPolicy::Oldest => voices.min_by_key(|(_, v)| v.age()),
            };
            chosen.map(|(i, _)| i)
        })
    }

    /// Release every voice triggered at `frequency`.
    pub fn note_off(&mut self, frequency: f32) {
        if self.release_note(frequency) == 0 {
            log::debug!("note off {frequency} Hz: no sounding voice");
        }
    }

    fn release_note(&mut self, frequency: f32) -> usize {
        let truncate = self.config.release_mode == ReleaseMode::Truncate;
        let mut released = 0;
        for voice in self.pool_mut() {
            if voice.frequency() == frequency && voice.state() == VoiceState::Active {
                voice.release();
                if truncate {
                    voice.silence();
                }
                released += 1;
            }
        }
        released
    }

    pub fn all_notes_off(&mut self) {
        let truncate = self.config.release_mode == ReleaseMode::Truncate;
        for voice in self.pool_mut() {
            voice.release();
            if truncate {
                voice.silence();
            }
        }
    }

    pub fn choose_algorithm(&mut self, name: &str) -> Result<()> {
        let algorithm = name.parse()?;
        self.set_algorithm(algorithm);
        Ok(())
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.apply_algorithm(algorithm);
        log::info!("algorithm set to {algorithm}");
    }

    fn apply_algorithm(&mut self, algorithm: Algorithm) {
        self.patch.set_algorithm(algorithm);
        self.reroute_voices();
    }

    pub fn set_destinations(&mut self, index: usize, targets: &[usize]) -> Result<()> {
        self.patch.set_destinations(index, targets)?;
        self.reroute_voices();
        Ok(())
    }

    /// Replace an operator template. Sounding voices keep their operators
    /// but follow a change of the disabled flag.
    pub fn set_oscillator(&mut self, index: usize, config: OscillatorConfig) -> Result<()> {
        self.patch.set_oscillator(index, config)?;
        self.reroute_voices();
        Ok(())
    }

    pub fn set_am_modulator(&mut self, modulator: Option<OscillatorConfig>) -> Result<()> {
        if let Some(config) = &modulator {
            config.validate()?;
        }
        self.output
            .source_mut()
            .set_modulator(modulator.map(|config| config.free_running()));
        Ok(())
    }

    pub fn set_pass_filter(&mut self, filter: Option<PassFilterConfig>) -> Result<()> {
        let Some(config) = filter else {
            *self.output.filter_mut() = None;
            return Ok(());
        };
        config.validate(self.config.sample_rate)?;

        let sample_rate = self.config.sample_rate;
        let filter = self.output.filter_mut();
        match filter {
            Some(current) if current.filter_type() == config.filter_type => {
                current.set_cutoff(config.cutoff_hz);
            }
            _ => {
                *filter = Some(PassFilter::new(config.filter_type, config.cutoff_hz, sample_rate));
            }
        }
        Ok(())
    }

    /// Retune the note-tracking carriers of every sounding voice.
    pub fn set_output_frequency(&mut self, frequency: f32) -> Result<()> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(Error::InvalidParameter {
                name: "frequency",
                value: frequency,
            });
        }
        for voice in self.pool_mut().iter_mut().filter(|v| !v.is_idle()) {
            voice.retune(frequency);
        }
        Ok(())
    }

    fn reroute_voices(&mut self) {
        let routing = self.patch.routing();
        let enabled = self.patch.enabled();
        for voice in self.pool_mut() {
            voice.reroute(&routing, enabled);
        }
    }

    /// Apply one control message. Does not log or allocate, so it is safe
    /// to call from the audio callback.
    pub fn apply(&mut self, message: SynthMessage) -> Result<()> {
        match message {
            SynthMessage::NoteOn { frequency } => {
                self.start_note(frequency)?;
            }
            SynthMessage::NoteOff { frequency } => {
                self.release_note(frequency);
            }
            SynthMessage::AllNotesOff => self.all_notes_off(),
            SynthMessage::SetAlgorithm(algorithm) => self.apply_algorithm(algorithm),
            SynthMessage::SetDestinations {
                index,
                destinations,
            } => {
                self.patch.set_routes(index, destinations)?;
                self.reroute_voices();
            }
            SynthMessage::SetOscillator { index, config } => self.set_oscillator(index, config)?,
            SynthMessage::SetAmModulator(modulator) => self.set_am_modulator(modulator)?,
            SynthMessage::SetPassFilter(filter) => self.set_pass_filter(filter)?,
            SynthMessage::SetOutputFrequency(frequency) => self.set_output_frequency(frequency)?,
        }
        Ok(())
    }

    fn process_messages(&mut self) {
        let Some(mut rx) = self.rx.take() else {
            return;
        };
        while let Some(message) = rx.pop() {
            if self.apply(message).is_err() {
                self.rejected += 1;
            }
        }
        self.rx = Some(rx);
    }

    /// Render the next block of the mix.
    pub fn render(&mut self, out: &mut [f32]) {
        self.process_messages();

        let ctx = RenderCtx::from_freq(self.config.sample_rate, 0.0);
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.output.render_block(chunk, &ctx);
        }

        if self.config.release_mode == ReleaseMode::RingOut {
            for voice in self.pool_mut() {
                if voice.state() == VoiceState::Releasing && voice.is_finished() {
                    voice.silence();
                }
            }
        }
    }
}

impl BlockSource for Synth {
    fn next_block(&mut self, out: &mut [f32]) -> bool {
        self.render(out);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::patch::EnvelopeParams;
    use crate::OSCILLATOR_COUNT;
    use std::collections::VecDeque;

    /// Pre-filled queue standing in for the control thread.
    struct Scripted(VecDeque<SynthMessage>);

    impl MessageReceiver for Scripted {
        fn pop(&mut self) -> Option<SynthMessage> {
            self.0.pop_front()
        }
    }

    fn quick_patch() -> Patch {
        let config = OscillatorConfig::default().envelope(EnvelopeParams::adsr(0.0, 0.0, 1.0, 0.05));
        Patch::new([config; OSCILLATOR_COUNT], Algorithm::Parallel).unwrap()
    }

    fn synth(config: EngineConfig) -> Synth {
        Synth::new(config, quick_patch()).unwrap()
    }

    fn frequencies(synth: &Synth) -> Vec<f32> {
        synth.voices().iter().map(|v| v.frequency()).collect()
    }

    #[test]
    fn eviction_newest_replaces_most_recent_voice() {
        let mut synth = synth(EngineConfig {
            max_voices: 2,
            ..EngineConfig::default()
        });
        for f in [220.0, 330.0, 440.0] {
            synth.note_on(f).unwrap();
        }
        assert_eq!(frequencies(&synth), vec![220.0, 440.0]);
    }

    #[test]
    fn eviction_oldest_replaces_first_voice() {
        let mut synth = synth(EngineConfig {
            max_voices: 2,
            eviction: EvictionPolicy::Oldest,
            ..EngineConfig::default()
        });
        for f in [220.0, 330.0, 440.0] {
            synth.note_on(f).unwrap();
        }
        assert_eq!(frequencies(&synth), vec![330.0, 440.0]);
    }

    #[test]
    fn truncate_removes_voice_on_note_off() {
        let mut synth = synth(EngineConfig::default());
        synth.note_on(220.0).unwrap();
        synth.note_on(330.0).unwrap();

        synth.note_off(220.0);
        assert_eq!(frequencies(&synth), vec![330.0]);

        synth.note_off(1_000.0);
        assert_eq!(synth.voice_count(), 1);
    }

    #[test]
    fn ring_out_keeps_voice_until_silent() {
        let mut synth = synth(EngineConfig {
            release_mode: ReleaseMode::RingOut,
            ..EngineConfig::default()
        });
        let mut out = vec![0.0f32; 256];

        synth.note_on(220.0).unwrap();
        synth.render(&mut out);
        synth.note_off(220.0);
        assert_eq!(synth.voice_count(), 1);

        synth.render(&mut out);
        assert!(out.iter().any(|&s| s != 0.0), "release tail is audible");

        // 50 ms release at 48 kHz
        for _ in 0..12 {
            synth.render(&mut out);
        }
        assert_eq!(synth.voice_count(), 0);
    }

    #[test]
    fn algorithm_change_reroutes_sounding_voices() {
        let mut synth = synth(EngineConfig::default());
        synth.note_on(220.0).unwrap();
        assert_eq!(synth.voices()[0].carrier_indices(), vec![0, 1, 2, 3]);

        synth.choose_algorithm("square").unwrap();
        assert_eq!(synth.voices()[0].carrier_indices(), vec![1, 3]);

        assert!(synth.choose_algorithm("ring").is_err());
        assert_eq!(synth.patch().algorithm(), Algorithm::Square);
    }

    #[test]
    fn re_enabled_operator_is_heard_again() {
        let mut synth = synth(EngineConfig::default());
        synth.note_on(220.0).unwrap();
        let mut out = vec![0.0f32; 256];
        synth.render(&mut out);

        let mut config = *synth.patch().oscillator(2).unwrap();
        synth.set_oscillator(2, config.disabled(true)).unwrap();
        assert_eq!(synth.voices()[0].carrier_indices(), vec![0, 1, 3]);
        synth.render(&mut out);

        config = config.disabled(false);
        synth.set_oscillator(2, config).unwrap();
        assert_eq!(synth.voices()[0].carrier_indices(), synth.patch().carriers());
        assert_eq!(synth.voices()[0].carrier_indices(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn voice_slots_are_reused_in_place() {
        let mut synth = synth(EngineConfig {
            max_voices: 2,
            ..EngineConfig::default()
        });
        let slots = synth.pool().as_ptr();
        let mut out = vec![0.0f32; 256];

        for f in [220.0, 330.0, 440.0, 550.0] {
            synth.note_on(f).unwrap();
            synth.render(&mut out);
            synth.set_algorithm(Algorithm::Stack);
            synth.note_off(f);
        }
        synth.set_algorithm(Algorithm::Parallel);

        assert_eq!(synth.pool().len(), 2);
        assert_eq!(synth.pool().as_ptr(), slots);
        assert_eq!(synth.voice_count(), 0);
    }

    #[test]
    fn released_slot_takes_the_next_note() {
        let mut synth = synth(EngineConfig {
            max_voices: 2,
            ..EngineConfig::default()
        });
        synth.note_on(220.0).unwrap();
        synth.note_on(330.0).unwrap();
        synth.note_off(220.0);

        // the freed slot is used, nothing is evicted
        synth.note_on(440.0).unwrap();
        let frequencies = frequencies(&synth);
        assert_eq!(frequencies, vec![330.0, 440.0]);
        assert_eq!(synth.pool()[0].frequency(), 440.0);
    }

    #[test]
    fn invalid_queued_messages_are_counted_not_applied() {
        let queue = VecDeque::from([
            SynthMessage::NoteOn { frequency: f32::NAN },
            SynthMessage::NoteOn { frequency: 330.0 },
            SynthMessage::SetOutputFrequency(-1.0),
            SynthMessage::SetAlgorithm(Algorithm::Square),
        ]);
        let mut synth = synth(EngineConfig::default()).with_receiver(Scripted(queue));

        let mut out = vec![0.0f32; 256];
        synth.render(&mut out);
        assert_eq!(synth.rejected_messages(), 2);
        assert_eq!(frequencies(&synth), vec![330.0]);
        assert_eq!(synth.voices()[0].carrier_indices(), vec![1, 3]);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn rejected_configuration_changes_nothing() {
        let mut synth = synth(EngineConfig::default());
        let before = synth.patch().clone();

        assert!(synth.set_destinations(1, &[0]).is_err());
        assert!(synth.set_pass_filter(Some(PassFilterConfig::lowpass(-5.0))).is_err());
        assert!(synth.note_on(f32::NAN).is_err());
        assert_eq!(synth.patch(), &before);
        assert_eq!(synth.voice_count(), 0);
    }

    #[test]
    fn silent_without_voices() {
        let mut synth = synth(EngineConfig::default());
        let mut out = vec![1.0f32; 256];
        synth.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn all_notes_off_clears_voices() {
        let mut synth = synth(EngineConfig::default());
        for f in [220.0, 330.0, 440.0] {
            synth.note_on(f).unwrap();
        }
        synth.all_notes_off();
        assert_eq!(synth.voice_count(), 0);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn queued_messages_apply_at_block_start() {
        let (mut synth, mut handle) =
            Synth::with_handle(EngineConfig::default(), quick_patch(), 16).unwrap();

        handle.note_on(440.0).unwrap();
        handle.choose_algorithm("stack").unwrap();
        assert_eq!(synth.voice_count(), 0);

        let mut out = vec![0.0f32; 256];
        synth.render(&mut out);
        assert_eq!(synth.voice_count(), 1);
        assert_eq!(synth.voices()[0].carrier_indices(), vec![3]);
        assert!(out.iter().any(|&s| s != 0.0));
        assert_eq!(synth.pool().len(), EngineConfig::default().max_voices);
        assert_eq!(synth.rejected_messages(), 0);
    }
}
