mod common;

use common::{assert_all_close, render, write_constant_wav};
use vsthw_engine::{AudioProcessor, BufferConfig, ChannelLayout, MidiEvent};
use vsthw_plugin::{PluginConfig, VoiceState, VstHwProcessor};

fn instrument_with_samples(count: usize, frames: usize) -> (VstHwProcessor, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut processor = VstHwProcessor::new(PluginConfig {
        is_synth: true,
        ..PluginConfig::default()
    });
    processor
        .prepare(
            &BufferConfig::new(48_000.0, 64, ChannelLayout::Stereo)
                .with_input(ChannelLayout::Disabled),
        )
        .expect("prepare");
    for index in 0..count {
        let wav = write_constant_wav(
            dir.path(),
            &format!("sample-{index}.wav"),
            1,
            48_000,
            frames,
            0.5,
        );
        processor
            .sample_loader()
            .load_blocking(&wav)
            .expect("load sample");
    }
    (processor, dir)
}

#[test]
fn middle_c_plays_the_sample_at_velocity_level() {
    let (mut processor, _dir) = instrument_with_samples(1, 4_800);
    let buffer = render(
        &mut processor,
        2,
        64,
        0.0,
        &[MidiEvent::note_on(0, 0, 60, 127)],
    );
    assert_all_close(buffer.channel(0).expect("left"), 0.5);

    let buffer = render(
        &mut processor,
        2,
        64,
        0.0,
        &[MidiEvent::note_on(0, 0, 64, 64)],
    );
    // Two voices now: the held middle C plus the quieter E.
    let expected = 0.5 + 0.5 * 64.0 / 127.0;
    assert_all_close(buffer.channel(1).expect("right"), expected);
}

#[test]
fn voices_go_quiet_once_the_sample_runs_out() {
    let (mut processor, _dir) = instrument_with_samples(1, 100);
    render(
        &mut processor,
        2,
        64,
        0.0,
        &[MidiEvent::note_on(0, 0, 60, 127)],
    );
    let buffer = render(&mut processor, 2, 64, 0.0, &[MidiEvent::note_off(0, 0, 60)]);
    assert!(buffer.channel(0).expect("left")[36..]
        .iter()
        .all(|sample| *sample == 0.0));

    let buffer = render(&mut processor, 2, 64, 0.0, &[]);
    assert!(buffer.channels().flatten().all(|sample| *sample == 0.0));
    assert_eq!(processor.synth().active_voice_count(), 0);
}

#[test]
fn pool_is_limited_to_three_voices() {
    let (mut processor, _dir) = instrument_with_samples(1, 48_000);
    render(
        &mut processor,
        2,
        64,
        0.0,
        &[
            MidiEvent::note_on(0, 0, 60, 100),
            MidiEvent::note_on(10, 0, 62, 100),
            MidiEvent::note_on(20, 0, 64, 100),
            MidiEvent::note_on(30, 0, 67, 100),
        ],
    );
    let synth = processor.synth();
    assert_eq!(synth.num_voices(), 3);
    assert_eq!(synth.active_voice_count(), 3);
    let mut notes: Vec<u8> = synth.active_notes().collect();
    notes.sort_unstable();
    assert_eq!(notes, vec![60, 64, 67]);
}

#[test]
fn stacked_samples_sound_together() {
    let (mut processor, _dir) = instrument_with_samples(2, 4_800);
    assert_eq!(processor.synth().bank().len(), 2);
    let buffer = render(
        &mut processor,
        2,
        32,
        0.0,
        &[MidiEvent::note_on(0, 0, 60, 127)],
    );
    // The second sound's note-on releases the first sound's voice, which
    // keeps ringing through its tail.
    assert_eq!(
        processor.synth().voice_states().collect::<Vec<_>>(),
        vec![VoiceState::Releasing, VoiceState::Sustaining, VoiceState::Idle]
    );
    assert_all_close(buffer.channel(0).expect("left"), 1.0);

    processor.synth().bank().clear();
    render(&mut processor, 2, 32, 0.0, &[MidiEvent::note_on(0, 0, 62, 127)]);
    assert_eq!(
        processor.synth().active_notes().filter(|note| *note == 62).count(),
        0
    );
}

#[test]
fn released_note_fades_to_silence_over_the_default_tail() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut processor = VstHwProcessor::new(PluginConfig {
        is_synth: true,
        ..PluginConfig::default()
    });
    processor
        .prepare(
            &BufferConfig::new(1_000.0, 64, ChannelLayout::Stereo)
                .with_input(ChannelLayout::Disabled),
        )
        .expect("prepare");
    // Twelve seconds, cut to ten on load. An octave down it lasts twenty,
    // so only the release can end the note.
    let wav = write_constant_wav(dir.path(), "pad.wav", 1, 1_000, 12_000, 0.5);
    processor
        .sample_loader()
        .load_blocking(&wav)
        .expect("load sample");

    render(
        &mut processor,
        2,
        64,
        0.0,
        &[
            MidiEvent::note_on(0, 0, 48, 127),
            MidiEvent::note_off(1, 0, 48),
        ],
    );
    assert!(processor
        .synth()
        .voice_states()
        .any(|state| state == VoiceState::Releasing));

    let mut rendered = 64;
    let mut halfway = None;
    let mut last = None;
    while rendered < 10_500 {
        let buffer = render(&mut processor, 2, 64, 0.0, &[]);
        rendered += 64;
        if halfway.is_none() && rendered >= 5_000 {
            halfway = Some(buffer.channel(0).expect("left")[0]);
        }
        last = Some(buffer);
    }

    let halfway = halfway.expect("halfway level");
    let last = last.expect("rendered blocks");
    assert!((0.2..0.3).contains(&halfway), "halfway level {halfway}");
    assert!(last.channels().flatten().all(|sample| *sample == 0.0));
    assert_eq!(processor.synth().active_voice_count(), 0);
}

#[test]
fn note_off_moves_voice_into_release() {
    let (mut processor, _dir) = instrument_with_samples(1, 48_000);
    render(
        &mut processor,
        2,
        16,
        0.0,
        &[MidiEvent::note_on(0, 0, 60, 127)],
    );
    assert!(processor
        .synth()
        .voice_states()
        .any(|state| state == VoiceState::Sustaining));

    render(&mut processor, 2, 16, 0.0, &[MidiEvent::note_off(0, 0, 60)]);
    assert!(processor
        .synth()
        .voice_states()
        .any(|state| state == VoiceState::Releasing));
}
