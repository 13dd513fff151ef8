//! VstHw Engine
//! ============
//! Host boundary for the VstHw plug-in: block buffers, bus layouts, MIDI
//! events and the processor/editor traits a host drives.

pub mod buffer;
pub mod plugin;

pub use buffer::{AudioBuffer, BufferConfig, BusesLayout, ChannelLayout};
pub use plugin::{AudioProcessor, MidiEvent, PluginDescriptor, PluginEditor, PluginError};
