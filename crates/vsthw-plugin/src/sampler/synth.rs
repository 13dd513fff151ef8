use std::cmp::Reverse;
use std::sync::Arc;

use arc_swap::Guard;
use crossbeam_channel::Sender;
use vsthw_engine::{AudioBuffer, MidiEvent};

use super::sound::{retire_sounds, Retired, SamplerSound, SoundBank, SoundList};
use super::voice::{SamplerVoice, VoiceState};
use crate::config::{SamplerConfig, SoundConfig};
use crate::loader::DecodedSample;

const CC_SUSTAIN_PEDAL: u8 = 64;
const CC_ALL_SOUND_OFF: u8 = 120;
const CC_ALL_NOTES_OFF: u8 = 123;

/// Polyphonic sample player with a fixed voice pool.
///
/// Sounds are read from a shared [`SoundBank`]; everything else is owned by
/// the audio thread. Nothing here allocates once the synthesiser is built,
/// and with a retire queue attached nothing is freed here either.
#[derive(Debug)]
pub struct Synthesiser {
    voices: Vec<SamplerVoice>,
    bank: SoundBank,
    sound_config: SoundConfig,
    sample_rate: f64,
    sustain_pedals: u16,
    note_counter: u64,
    retire: Option<Sender<Retired>>,
}

impl Synthesiser {
    pub fn new(config: &SamplerConfig, bank: SoundBank) -> Self {
        let voices = (0..config.voices).map(|_| SamplerVoice::new()).collect();
        Self {
            voices,
            bank,
            sound_config: config.sound.clone(),
            sample_rate: 0.0,
            sustain_pedals: 0,
            note_counter: 0,
            retire: None,
        }
    }

    /// Sends sounds and sound lists the audio thread would otherwise free
    /// to `queue`. See [`retire_queue`](super::retire_queue).
    pub fn set_retire_queue(&mut self, queue: Sender<Retired>) {
        for voice in &mut self.voices {
            voice.set_retire_queue(queue.clone());
        }
        self.retire = Some(queue);
    }

    /// Sets the playback rate of every voice and silences whatever was
    /// playing.
    pub fn configure(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.sustain_pedals = 0;
        for voice in &mut self.voices {
            voice.stop_note(false);
            voice.set_playback_rate(sample_rate);
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn bank(&self) -> &SoundBank {
        &self.bank
    }

    /// Installs `decoded` over the full note range. `None` leaves the
    /// current sounds untouched.
    pub fn load_sample(&self, name: &str, decoded: Option<DecodedSample>) -> bool {
        self.bank.load_sample(name, decoded, &self.sound_config)
    }

    pub fn voices(&self) -> &[SamplerVoice] {
        &self.voices
    }

    pub fn num_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|voice| voice.is_active()).count()
    }

    /// Notes of the sounding voices, in voice order.
    pub fn active_notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.voices.iter().filter_map(SamplerVoice::current_note)
    }

    /// Renders `[start_sample, start_sample + num_samples)` additively into
    /// `buffer`, applying each MIDI event at its sample offset. Events are
    /// expected in time order. Offsets before the window apply at its start;
    /// offsets at or past its end are dropped.
    pub fn render(
        &mut self,
        buffer: &mut AudioBuffer,
        midi: &[MidiEvent],
        start_sample: usize,
        num_samples: usize,
    ) {
        let sounds = self.bank.snapshot();
        let end = start_sample + num_samples;
        let mut position = start_sample;

        for event in midi {
            let offset = event.sample_offset() as usize;
            if offset >= end {
                continue;
            }
            let at = offset.max(position);
            if at > position {
                self.render_voices(buffer, position, at - position);
                position = at;
            }
            self.handle_event(&sounds, event);
        }

        if end > position {
            self.render_voices(buffer, position, end - position);
        }
        // The bank may have swapped lists since the snapshot was taken.
        retire_sounds(self.retire.as_ref(), Guard::into_inner(sounds));
    }

    fn render_voices(&mut self, buffer: &mut AudioBuffer, start: usize, num_samples: usize) {
        let outputs = buffer.as_mut_slice();
        for voice in &mut self.voices {
            voice.render(outputs, start, num_samples);
        }
    }

    pub fn handle_event(&mut self, sounds: &SoundList, event: &MidiEvent) {
        match *event {
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
                ..
            } => {
                if velocity > 0 {
                    self.note_on(sounds, channel, note, velocity);
                } else {
                    self.note_off(channel, note, true);
                }
            }
            MidiEvent::NoteOff { channel, note, .. } => self.note_off(channel, note, true),
            MidiEvent::ControlChange {
                channel,
                control,
                value,
                ..
            } => match control {
                CC_SUSTAIN_PEDAL => self.sustain_pedal(channel, value >= 64),
                CC_ALL_NOTES_OFF | CC_ALL_SOUND_OFF => self.all_notes_off(Some(channel), true),
                _ => {}
            },
            MidiEvent::PitchBend { .. } => {}
        }
    }

    pub fn note_on(&mut self, sounds: &SoundList, channel: u8, note: u8, velocity: u8) {
        for sound in sounds.iter().filter(|sound| sound.applies_to_note(note)) {
            // A key struck again while its previous note still rings,
            // whichever sound that note came from.
            for voice in &mut self.voices {
                if voice.is_playing(note, channel) {
                    voice.stop_note(true);
                }
            }
            if let Some(index) = self.find_free_voice(note) {
                self.start_voice(index, sound, channel, note, velocity);
            }
        }
    }

    pub fn note_off(&mut self, channel: u8, note: u8, allow_tail_off: bool) {
        for voice in &mut self.voices {
            if voice.current_note() == Some(note) && voice.channel() == channel {
                voice.set_key_down(false);
                if !voice.is_sustain_pedal_down() {
                    voice.stop_note(allow_tail_off);
                }
            }
        }
    }

    /// `None` addresses every channel.
    pub fn all_notes_off(&mut self, channel: Option<u8>, allow_tail_off: bool) {
        for voice in &mut self.voices {
            if voice.is_active() && channel.map_or(true, |c| voice.channel() == c) {
                voice.stop_note(allow_tail_off);
            }
        }
        match channel {
            Some(c) => self.sustain_pedals &= !channel_bit(c),
            None => self.sustain_pedals = 0,
        }
    }

    pub fn sustain_pedal(&mut self, channel: u8, down: bool) {
        if down {
            self.sustain_pedals |= channel_bit(channel);
            for voice in &mut self.voices {
                if voice.is_active() && voice.channel() == channel && voice.is_key_down() {
                    voice.set_sustain_pedal_down(true);
                }
            }
        } else {
            self.sustain_pedals &= !channel_bit(channel);
            for voice in &mut self.voices {
                if voice.is_active() && voice.channel() == channel {
                    voice.set_sustain_pedal_down(false);
                    if !voice.is_key_down() {
                        voice.stop_note(true);
                    }
                }
            }
        }
    }

    fn start_voice(
        &mut self,
        index: usize,
        sound: &Arc<SamplerSound>,
        channel: u8,
        note: u8,
        velocity: u8,
    ) {
        self.note_counter += 1;
        let pedal = self.sustain_pedals & channel_bit(channel) != 0;
        let voice = &mut self.voices[index];
        if voice.is_active() {
            voice.stop_note(false);
        }
        voice.start_note(Arc::clone(sound), note, channel, velocity, self.note_counter);
        voice.set_key_down(true);
        voice.set_sustain_pedal_down(pedal);
    }

    fn find_free_voice(&self, note: u8) -> Option<usize> {
        self.voices
            .iter()
            .position(|voice| !voice.is_active())
            .or_else(|| self.find_voice_to_steal(note))
    }

    /// Prefers, oldest first: a voice already on this pitch, a released
    /// voice, a voice without a key held, then any voice. The lowest and
    /// highest held notes are protected until nothing else is left.
    fn find_voice_to_steal(&self, note: u8) -> Option<usize> {
        let held = || {
            self.voices
                .iter()
                .enumerate()
                .filter(|(_, voice)| voice.is_active() && voice.is_key_down())
        };
        let low = held()
            .min_by_key(|(_, voice)| (voice.current_note(), voice.started_at()))
            .map(|(i, _)| i);
        let top = held()
            .max_by_key(|(_, voice)| (voice.current_note(), Reverse(voice.started_at())))
            .map(|(i, _)| i)
            .filter(|&i| Some(i) != low);
        let unprotected = |i: usize| Some(i) != low && Some(i) != top;

        self.oldest_where(|_, voice| voice.current_note() == Some(note))
            .or_else(|| {
                self.oldest_where(|i, voice| unprotected(i) && voice.is_playing_but_released())
            })
            .or_else(|| self.oldest_where(|i, voice| unprotected(i) && !voice.is_key_down()))
            .or_else(|| self.oldest_where(|i, _| unprotected(i)))
            .or(top)
            .or(low)
    }

    fn oldest_where(&self, accept: impl Fn(usize, &SamplerVoice) -> bool) -> Option<usize> {
        self.voices
            .iter()
            .enumerate()
            .filter(|(i, voice)| voice.is_active() && accept(*i, *voice))
            .min_by_key(|(_, voice)| voice.started_at())
            .map(|(i, _)| i)
    }

    /// States of all voices, in pool order.
    pub fn voice_states(&self) -> impl Iterator<Item = VoiceState> + '_ {
        self.voices.iter().map(SamplerVoice::state)
    }
}

fn channel_bit(channel: u8) -> u16 {
    1u16 << (channel & 0x0F)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth_with_sample(frames: usize) -> Synthesiser {
        let mut synth = Synthesiser::new(&SamplerConfig::default(), SoundBank::new());
        assert!(synth.load_sample(
            "dc",
            Some(DecodedSample {
                sample_rate: 1_000,
                channels: vec![vec![1.0; frames]],
            })
        ));
        synth.configure(1_000.0);
        synth
    }

    fn play(synth: &mut Synthesiser, events: &[MidiEvent], frames: usize) -> AudioBuffer {
        let mut buffer = AudioBuffer::new(2, frames);
        synth.render(&mut buffer, events, 0, frames);
        buffer
    }

    #[test]
    fn events_are_applied_at_their_offset() {
        let mut synth = synth_with_sample(1_000);
        let buffer = play(&mut synth, &[MidiEvent::note_on(4, 0, 60, 127)], 8);
        let left = buffer.channel(0).unwrap();
        assert!(left[..4].iter().all(|s| *s == 0.0));
        assert!(left[4..].iter().all(|s| *s > 0.0));
    }

    #[test]
    fn offsets_past_the_block_are_ignored() {
        let mut synth = synth_with_sample(1_000);
        let buffer = play(
            &mut synth,
            &[
                MidiEvent::note_on(8, 0, 60, 127),
                MidiEvent::note_on(500, 0, 64, 127),
            ],
            8,
        );
        assert_eq!(synth.active_voice_count(), 0);
        assert!(buffer.channels().flatten().all(|s| *s == 0.0));
    }

    #[test]
    fn restruck_key_releases_the_ringing_voice() {
        let mut synth = synth_with_sample(1_000);
        let events = [
            MidiEvent::note_on(0, 0, 60, 100),
            MidiEvent::note_on(2, 0, 60, 100),
        ];
        play(&mut synth, &events, 4);
        assert_eq!(
            synth.voice_states().collect::<Vec<_>>(),
            vec![VoiceState::Releasing, VoiceState::Sustaining, VoiceState::Idle]
        );
    }

    #[test]
    fn zero_velocity_note_on_releases() {
        let mut synth = synth_with_sample(1_000);
        play(&mut synth, &[MidiEvent::note_on(0, 0, 60, 100)], 4);
        play(&mut synth, &[MidiEvent::note_on(0, 0, 60, 0)], 4);
        assert_eq!(synth.voice_states().next(), Some(VoiceState::Releasing));
    }

    #[test]
    fn fourth_note_steals_an_unprotected_voice() {
        let mut synth = synth_with_sample(1_000);
        let chord = [
            MidiEvent::note_on(0, 0, 60, 100),
            MidiEvent::note_on(1, 0, 62, 100),
            MidiEvent::note_on(2, 0, 64, 100),
            MidiEvent::note_on(3, 0, 67, 100),
        ];
        play(&mut synth, &chord, 8);
        let mut notes: Vec<u8> = synth.active_notes().collect();
        notes.sort_unstable();
        assert_eq!(notes, vec![60, 64, 67]);
    }

    #[test]
    fn released_voice_is_stolen_first() {
        let mut synth = synth_with_sample(1_000);
        let events = [
            MidiEvent::note_on(0, 0, 60, 100),
            MidiEvent::note_on(1, 0, 62, 100),
            MidiEvent::note_on(2, 0, 64, 100),
            MidiEvent::note_off(3, 0, 64),
            MidiEvent::note_on(4, 0, 67, 100),
        ];
        play(&mut synth, &events, 8);
        let mut notes: Vec<u8> = synth.active_notes().collect();
        notes.sort_unstable();
        assert_eq!(notes, vec![60, 62, 67]);
    }

    #[test]
    fn sustain_pedal_holds_released_keys() {
        let mut synth = synth_with_sample(1_000);
        let events = [
            MidiEvent::note_on(0, 0, 60, 100),
            MidiEvent::control_change(1, 0, CC_SUSTAIN_PEDAL, 127),
            MidiEvent::note_off(2, 0, 60),
        ];
        play(&mut synth, &events, 4);
        assert_eq!(synth.voice_states().next(), Some(VoiceState::Sustaining));

        play(&mut synth, &[MidiEvent::control_change(0, 0, CC_SUSTAIN_PEDAL, 0)], 4);
        assert_eq!(synth.voice_states().next(), Some(VoiceState::Releasing));
    }

    #[test]
    fn all_notes_off_and_all_sound_off_both_tail_off() {
        let mut synth = synth_with_sample(1_000);
        play(
            &mut synth,
            &[
                MidiEvent::note_on(0, 0, 60, 100),
                MidiEvent::note_on(0, 1, 64, 100),
                MidiEvent::note_on(0, 2, 67, 100),
            ],
            2,
        );
        play(&mut synth, &[MidiEvent::control_change(0, 0, CC_ALL_NOTES_OFF, 0)], 2);
        play(&mut synth, &[MidiEvent::control_change(0, 1, CC_ALL_SOUND_OFF, 0)], 2);
        assert_eq!(synth.active_voice_count(), 3);
        assert_eq!(
            synth.voice_states().collect::<Vec<_>>(),
            vec![VoiceState::Releasing, VoiceState::Releasing, VoiceState::Sustaining]
        );
    }

    #[test]
    fn configure_silences_voices() {
        let mut synth = synth_with_sample(1_000);
        play(&mut synth, &[MidiEvent::note_on(0, 0, 60, 100)], 2);
        synth.configure(2_000.0);
        assert_eq!(synth.active_voice_count(), 0);
        assert_eq!(synth.sample_rate(), 2_000.0);
    }

    #[test]
    fn cleared_sound_is_freed_through_the_retire_queue() {
        let (queue, retired) = crate::sampler::retire_queue();
        let mut synth = synth_with_sample(100);
        synth.set_retire_queue(queue);
        play(&mut synth, &[MidiEvent::note_on(0, 0, 60, 100)], 8);

        synth.bank().clear();
        play(&mut synth, &[], 200);
        assert_eq!(synth.active_voice_count(), 0);

        let sounds: Vec<Retired> = retired.try_iter().collect();
        assert_eq!(sounds.len(), 1);
        match &sounds[0] {
            Retired::Sound(sound) => {
                assert_eq!(sound.name(), "dc");
                assert_eq!(Arc::strong_count(sound), 1);
            }
            other => panic!("expected a sound, got {other:?}"),
        }
    }

    #[test]
    fn without_sounds_notes_are_ignored() {
        let mut synth = Synthesiser::new(&SamplerConfig::default(), SoundBank::new());
        synth.configure(48_000.0);
        let buffer = play(&mut synth, &[MidiEvent::note_on(0, 0, 60, 100)], 16);
        assert_eq!(synth.active_voice_count(), 0);
        assert!(buffer.channels().flatten().all(|s| *s == 0.0));
    }
}
