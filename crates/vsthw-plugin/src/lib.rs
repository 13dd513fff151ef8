//! VstHw
//! =====
//!
//! An audio plug-in that scales its input by a user-controlled gain and
//! mixes a polyphonic sample player on top. MIDI notes trigger the loaded
//! sample, pitch-shifted relative to middle C.
//!
//! The crate builds both as an `rlib` and as a `cdylib` exporting
//! `vsthw_plugin_entrypoint`.

pub mod config;
pub mod editor;
pub mod factory;
pub mod loader;
pub mod params;
pub mod processor;
pub mod sampler;

pub use config::{PluginConfig, SamplerConfig, SoundConfig};
pub use editor::{GainSlider, LoadButton, Rect, VstHwEditor};
pub use factory::VstHwFactory;
pub use loader::{
    decode_file, DecodedSample, DocumentsFileChooser, FileChooser, LoadHandle, SampleLoadError,
    SampleLoader,
};
pub use params::{GainParameter, GAIN_PARAM};
pub use processor::VstHwProcessor;
pub use sampler::{
    retire_queue, NoteSet, Retired, SamplerSound, SamplerVoice, SoundBank, Synthesiser, VoiceState,
};

vsthw_plugin_sdk::declare_vsthw_plugins!(factory::VstHwFactory::default());
