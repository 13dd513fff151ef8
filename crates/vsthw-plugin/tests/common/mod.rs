#![allow(dead_code)]

use std::path::{Path, PathBuf};

use vsthw_engine::{AudioBuffer, AudioProcessor, MidiEvent};
use vsthw_plugin::VstHwProcessor;

/// Writes a 16-bit WAV where every channel holds `value` for `frames` frames.
pub fn write_constant_wav(
    dir: &Path,
    name: &str,
    channels: u16,
    sample_rate: u32,
    frames: usize,
    value: f32,
) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    let sample = (value * i16::MAX as f32) as i16;
    for _ in 0..frames * channels as usize {
        writer.write_sample(sample).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
    path
}

pub fn render(
    processor: &mut VstHwProcessor,
    channels: usize,
    frames: usize,
    fill: f32,
    midi: &[MidiEvent],
) -> AudioBuffer {
    let mut buffer = AudioBuffer::from_channels(vec![vec![fill; frames]; channels]);
    processor.process(&mut buffer, midi).expect("process");
    buffer
}

pub fn assert_all_close(samples: &[f32], expected: f32) {
    for (index, sample) in samples.iter().enumerate() {
        assert!(
            (sample - expected).abs() < 1e-3,
            "frame {index}: expected {expected}, got {sample}"
        );
    }
}
