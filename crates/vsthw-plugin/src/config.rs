use serde::{Deserialize, Serialize};

/// Mapping and envelope applied to every loaded sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundConfig {
    /// Note at which the sample plays back at its recorded pitch.
    pub root_note: u8,
    /// Seconds.
    pub attack: f32,
    /// Seconds spent falling from peak to `sustain`.
    pub decay: f32,
    /// Level in `0.0..=1.0`.
    pub sustain: f32,
    /// Seconds.
    pub release: f32,
    /// Longer audio is truncated when the sound is built.
    pub max_sample_seconds: f32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            root_note: 60,
            attack: 0.0,
            decay: 0.001,
            sustain: 1.0,
            release: 10.0,
            max_sample_seconds: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Size of the voice pool. Fixed once the synthesiser is built.
    pub voices: usize,
    pub sound: SoundConfig,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            voices: 3,
            sound: SoundConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PluginConfig {
    /// Pure generator: no input bus, any mono/stereo output accepted.
    pub is_synth: bool,
    pub sampler: SamplerConfig,
}
