use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AudioBuffer, BufferConfig, BusesLayout};

/// Metadata describing a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub id: String,
    pub name: String,
    pub vendor: String,
    pub version: Option<String>,
    pub description: Option<String>,
}

impl PluginDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            vendor: vendor.into(),
            version: None,
            description: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Display for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.vendor)
    }
}

/// MIDI message delivered with an audio block.
///
/// `sample_offset` is relative to the first frame of the block the event
/// was delivered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiEvent {
    NoteOn {
        sample_offset: u32,
        channel: u8,
        note: u8,
        velocity: u8,
    },
    NoteOff {
        sample_offset: u32,
        channel: u8,
        note: u8,
        velocity: u8,
    },
    ControlChange {
        sample_offset: u32,
        channel: u8,
        control: u8,
        value: u8,
    },
    PitchBend {
        sample_offset: u32,
        channel: u8,
        lsb: u8,
        msb: u8,
    },
}

impl MidiEvent {
    pub fn note_on(sample_offset: u32, channel: u8, note: u8, velocity: u8) -> Self {
        MidiEvent::NoteOn {
            sample_offset,
            channel,
            note,
            velocity,
        }
    }

    pub fn note_off(sample_offset: u32, channel: u8, note: u8) -> Self {
        MidiEvent::NoteOff {
            sample_offset,
            channel,
            note,
            velocity: 0,
        }
    }

    pub fn control_change(sample_offset: u32, channel: u8, control: u8, value: u8) -> Self {
        MidiEvent::ControlChange {
            sample_offset,
            channel,
            control,
            value,
        }
    }

    /// Decodes a raw three byte channel message. Returns `None` for status
    /// bytes this plugin has no use for.
    pub fn from_raw(sample_offset: u32, data: [u8; 3]) -> Option<Self> {
        let status = data[0] & 0xF0;
        let channel = data[0] & 0x0F;

        match status {
            0x80 => Some(MidiEvent::NoteOff {
                sample_offset,
                channel,
                note: data[1],
                velocity: data[2],
            }),
            0x90 => Some(MidiEvent::NoteOn {
                sample_offset,
                channel,
                note: data[1],
                velocity: data[2],
            }),
            0xB0 => Some(MidiEvent::ControlChange {
                sample_offset,
                channel,
                control: data[1],
                value: data[2],
            }),
            0xE0 => Some(MidiEvent::PitchBend {
                sample_offset,
                channel,
                lsb: data[1],
                msb: data[2],
            }),
            _ => None,
        }
    }

    pub fn sample_offset(&self) -> u32 {
        match self {
            MidiEvent::NoteOn { sample_offset, .. }
            | MidiEvent::NoteOff { sample_offset, .. }
            | MidiEvent::ControlChange { sample_offset, .. }
            | MidiEvent::PitchBend { sample_offset, .. } => *sample_offset,
        }
    }

    pub fn channel(&self) -> u8 {
        match self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. } => *channel,
        }
    }
}

/// Errors that can be returned by plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin reported an invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported bus layout: {0:?}")]
    UnsupportedLayout(BusesLayout),
    #[error("plugin is not ready to process")]
    NotPrepared,
}

/// Editor surface handed to the host. Drawing is left to whatever toolkit
/// the host embeds; the editor only owns its controls and their layout.
pub trait PluginEditor: Send {
    fn size(&self) -> (u32, u32);
    fn resized(&mut self, width: u32, height: u32);
}

/// Primary audio processor trait implemented by plugins.
///
/// `process` is called on the host's real-time audio thread. Implementations
/// must not block, allocate or perform I/O there.
pub trait AudioProcessor: Send + Sync {
    fn descriptor(&self) -> PluginDescriptor;
    fn prepare(&mut self, config: &BufferConfig) -> anyhow::Result<()>;
    fn process(&mut self, buffer: &mut AudioBuffer, midi: &[MidiEvent]) -> anyhow::Result<()>;

    /// Called when playback stops. Nothing is held by default.
    fn release_resources(&mut self) {}

    /// Mono or stereo output, with the input matching the output.
    fn supports_layout(&self, layout: &BusesLayout) -> bool {
        layout.main_output.is_mono_or_stereo() && layout.main_input == layout.main_output
    }

    /// Returns the processing latency in samples introduced by the processor.
    fn latency_samples(&self) -> usize {
        0
    }

    fn tail_length_seconds(&self) -> f64 {
        0.0
    }

    fn accepts_midi(&self) -> bool {
        false
    }

    fn produces_midi(&self) -> bool {
        false
    }

    fn is_midi_effect(&self) -> bool {
        false
    }

    fn has_editor(&self) -> bool {
        false
    }

    fn create_editor(&mut self) -> Option<Box<dyn PluginEditor>> {
        None
    }

    /// Opaque state blob saved by the host.
    fn get_state(&self) -> Vec<u8> {
        Vec::new()
    }

    fn set_state(&mut self, _data: &[u8]) {}

    // Some hosts misbehave when a plugin reports zero programs.
    fn num_programs(&self) -> usize {
        1
    }

    fn current_program(&self) -> usize {
        0
    }

    fn set_current_program(&mut self, _index: usize) {}

    fn program_name(&self, _index: usize) -> String {
        String::new()
    }

    fn change_program_name(&mut self, _index: usize, _name: &str) {}
}
