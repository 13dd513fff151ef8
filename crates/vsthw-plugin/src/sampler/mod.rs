//! Sample playback: sounds, a fixed pool of voices and the synthesiser that
//! routes MIDI to them.

mod envelope;
mod sound;
mod synth;
mod voice;

pub use sound::{retire_queue, NoteSet, Retired, SamplerSound, SoundBank, SoundList};
pub use synth::Synthesiser;
pub use voice::{SamplerVoice, VoiceState};
