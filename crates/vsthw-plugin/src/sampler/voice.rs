use std::sync::Arc;

use crossbeam_channel::Sender;

use super::envelope::{Envelope, EnvelopeStage};
use super::sound::{retire_sound, Retired, SamplerSound};

/// Externally visible lifecycle of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Attacking,
    Sustaining,
    Releasing,
}

impl From<EnvelopeStage> for VoiceState {
    fn from(stage: EnvelopeStage) -> Self {
        match stage {
            EnvelopeStage::Idle => VoiceState::Idle,
            // The short fall from peak to the sustain level is still part of
            // the note's onset.
            EnvelopeStage::Attack | EnvelopeStage::Decay => VoiceState::Attacking,
            EnvelopeStage::Sustain => VoiceState::Sustaining,
            EnvelopeStage::Release => VoiceState::Releasing,
        }
    }
}

/// One playback unit. Plays a single note of a [`SamplerSound`] at a time.
#[derive(Debug)]
pub struct SamplerVoice {
    sound: Option<Arc<SamplerSound>>,
    note: u8,
    channel: u8,
    level: f32,
    pitch_ratio: f64,
    position: f64,
    playback_rate: f64,
    envelope: Envelope,
    started_at: u64,
    key_down: bool,
    sustain_pedal_down: bool,
    retire: Option<Sender<Retired>>,
}

impl Default for SamplerVoice {
    fn default() -> Self {
        Self {
            sound: None,
            note: 0,
            channel: 0,
            level: 0.0,
            pitch_ratio: 1.0,
            position: 0.0,
            playback_rate: 44_100.0,
            envelope: Envelope::default(),
            started_at: 0,
            key_down: false,
            sustain_pedal_down: false,
            retire: None,
        }
    }
}

impl SamplerVoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_playback_rate(&mut self, sample_rate: f64) {
        self.playback_rate = sample_rate.max(1.0);
        self.envelope.set_sample_rate(self.playback_rate as f32);
    }

    pub fn state(&self) -> VoiceState {
        if self.sound.is_none() {
            VoiceState::Idle
        } else {
            VoiceState::from(self.envelope.stage())
        }
    }

    pub fn is_active(&self) -> bool {
        self.sound.is_some()
    }

    pub fn current_note(&self) -> Option<u8> {
        self.sound.as_ref().map(|_| self.note)
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Where the voice hands a sound it was the last user of.
    pub(crate) fn set_retire_queue(&mut self, queue: Sender<Retired>) {
        self.retire = Some(queue);
    }

    pub(crate) fn started_at(&self) -> u64 {
        self.started_at
    }

    pub(crate) fn is_key_down(&self) -> bool {
        self.key_down
    }

    pub(crate) fn set_key_down(&mut self, down: bool) {
        self.key_down = down;
    }

    pub(crate) fn is_sustain_pedal_down(&self) -> bool {
        self.sustain_pedal_down
    }

    pub(crate) fn set_sustain_pedal_down(&mut self, down: bool) {
        self.sustain_pedal_down = down;
    }

    /// Sounding, but neither held by a key nor by the pedal.
    pub(crate) fn is_playing_but_released(&self) -> bool {
        self.is_active() && !(self.key_down || self.sustain_pedal_down)
    }

    pub(crate) fn is_playing(&self, note: u8, channel: u8) -> bool {
        self.current_note() == Some(note) && self.channel == channel
    }

    pub(crate) fn start_note(
        &mut self,
        sound: Arc<SamplerSound>,
        note: u8,
        channel: u8,
        velocity: u8,
        started_at: u64,
    ) {
        let config = sound.config();
        self.pitch_ratio = 2f64.powf((note as f64 - config.root_note as f64) / 12.0)
            * sound.source_rate()
            / self.playback_rate;
        self.envelope
            .set_params(config.attack, config.decay, config.sustain, config.release);
        self.envelope.note_on();
        self.position = 0.0;
        self.level = velocity as f32 / 127.0;
        self.note = note;
        self.channel = channel;
        self.started_at = started_at;
        self.sound = Some(sound);
    }

    /// With `allow_tail_off` the envelope releases; otherwise the voice is
    /// silenced on the spot.
    pub(crate) fn stop_note(&mut self, allow_tail_off: bool) {
        if allow_tail_off {
            self.envelope.note_off();
            if !self.envelope.is_active() {
                self.clear();
            }
        } else {
            self.clear();
        }
    }

    fn clear(&mut self) {
        self.envelope.reset();
        self.key_down = false;
        self.sustain_pedal_down = false;
        if let Some(sound) = self.sound.take() {
            retire_sound(self.retire.as_ref(), sound);
        }
    }

    /// Adds `num_samples` frames starting at `start` into `outputs`.
    pub(crate) fn render(&mut self, outputs: &mut [Vec<f32>], start: usize, num_samples: usize) {
        let Some(sound) = self.sound.as_deref() else {
            return;
        };
        let left_in = sound.channel(0);
        let right_in = sound.channel(1);
        let length = sound.len();
        let mut finished = false;

        for frame in start..start + num_samples {
            let index = self.position as usize;
            if index >= length {
                finished = true;
                break;
            }
            let alpha = (self.position - index as f64) as f32;
            let next = index + 1;
            let interpolate = |data: &[f32]| {
                let a = data[index];
                let b = data.get(next).copied().unwrap_or(0.0);
                a * (1.0 - alpha) + b * alpha
            };

            let envelope = self.envelope.next();
            let gain = self.level * envelope;
            let left = interpolate(left_in) * gain;
            let right = interpolate(right_in) * gain;

            match &mut outputs[..] {
                [] => {}
                [mono] => {
                    if let Some(out) = mono.get_mut(frame) {
                        *out += (left + right) * 0.5;
                    }
                }
                [out_left, out_right, ..] => {
                    if let Some(out) = out_left.get_mut(frame) {
                        *out += left;
                    }
                    if let Some(out) = out_right.get_mut(frame) {
                        *out += right;
                    }
                }
            }

            if !self.envelope.is_active() {
                finished = true;
                break;
            }
            self.position += self.pitch_ratio;
        }

        if finished {
            self.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SoundConfig;
    use crate::loader::DecodedSample;
    use crate::sampler::sound::{retire_queue, NoteSet};

    fn sound(frames: usize, rate: u32, config: SoundConfig) -> Arc<SamplerSound> {
        Arc::new(SamplerSound::new(
            "ramp",
            DecodedSample {
                sample_rate: rate,
                channels: vec![(0..frames).map(|i| i as f32).collect()],
            },
            NoteSet::all(),
            config,
        ))
    }

    #[test]
    fn root_note_at_matching_rate_plays_sample_verbatim() {
        let mut voice = SamplerVoice::new();
        voice.set_playback_rate(48_000.0);
        voice.start_note(sound(16, 48_000, SoundConfig::default()), 60, 0, 127, 1);
        assert_eq!(voice.state(), VoiceState::Sustaining);

        let mut out = vec![vec![0.0; 4], vec![0.0; 4]];
        voice.render(&mut out, 0, 4);
        assert_eq!(out[0], vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(out[1], out[0]);
    }

    #[test]
    fn octave_up_reads_every_other_frame() {
        let mut voice = SamplerVoice::new();
        voice.set_playback_rate(48_000.0);
        voice.start_note(sound(16, 48_000, SoundConfig::default()), 72, 0, 127, 1);
        let mut out = vec![vec![0.0; 3]];
        voice.render(&mut out, 0, 3);
        assert_eq!(out[0], vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn voice_goes_idle_at_sample_end() {
        let mut voice = SamplerVoice::new();
        voice.set_playback_rate(48_000.0);
        voice.start_note(sound(4, 48_000, SoundConfig::default()), 60, 0, 127, 1);
        let mut out = vec![vec![0.0; 8]];
        voice.render(&mut out, 0, 8);
        assert_eq!(voice.state(), VoiceState::Idle);
        assert!(out[0][4..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn envelope_drives_state_machine() {
        let config = SoundConfig {
            attack: 0.001,
            decay: 0.0,
            release: 0.001,
            ..SoundConfig::default()
        };
        let mut voice = SamplerVoice::new();
        voice.set_playback_rate(1_000.0);
        voice.start_note(sound(100, 1_000, config), 60, 0, 127, 1);
        assert_eq!(voice.state(), VoiceState::Attacking);

        let mut out = vec![vec![0.0; 4]];
        voice.render(&mut out, 0, 2);
        assert_eq!(voice.state(), VoiceState::Sustaining);

        voice.stop_note(true);
        assert_eq!(voice.state(), VoiceState::Releasing);
        voice.render(&mut out, 2, 2);
        assert_eq!(voice.state(), VoiceState::Idle);
    }

    #[test]
    fn finished_voice_hands_back_a_sound_nobody_else_holds() {
        let (queue, retired) = retire_queue();
        let mut voice = SamplerVoice::new();
        voice.set_playback_rate(48_000.0);
        voice.set_retire_queue(queue);
        voice.start_note(sound(4, 48_000, SoundConfig::default()), 60, 0, 127, 1);

        let mut out = vec![vec![0.0; 8]];
        voice.render(&mut out, 0, 8);
        assert_eq!(voice.state(), VoiceState::Idle);
        assert!(matches!(retired.try_recv(), Ok(Retired::Sound(_))));
    }
}
