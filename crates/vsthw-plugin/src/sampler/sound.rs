use std::ops::Range;
use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::config::SoundConfig;
use crate::loader::DecodedSample;

const MAX_CHANNELS: usize = 2;
const RETIRE_QUEUE_LEN: usize = 32;

/// Set of MIDI notes a sound responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoteSet(u128);

impl NoteSet {
    pub fn empty() -> Self {
        Self(0)
    }

    /// Every note in `range`; values above 127 are ignored.
    pub fn range(range: Range<u8>) -> Self {
        let mut set = Self::empty();
        for note in range.take_while(|note| *note < 128) {
            set.insert(note);
        }
        set
    }

    pub fn all() -> Self {
        Self::range(0..128)
    }

    pub fn insert(&mut self, note: u8) {
        if note < 128 {
            self.0 |= 1u128 << note;
        }
    }

    pub fn contains(&self, note: u8) -> bool {
        note < 128 && self.0 & (1u128 << note) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// A decoded sample mapped onto a note range, playable by any voice.
#[derive(Debug, Clone)]
pub struct SamplerSound {
    name: String,
    channels: Vec<Vec<f32>>,
    source_rate: f64,
    notes: NoteSet,
    config: SoundConfig,
}

impl SamplerSound {
    /// Keeps at most two channels and `config.max_sample_seconds` of audio.
    pub fn new(
        name: impl Into<String>,
        decoded: DecodedSample,
        notes: NoteSet,
        config: SoundConfig,
    ) -> Self {
        let max_frames =
            (config.max_sample_seconds.max(0.0) as f64 * decoded.sample_rate as f64) as usize;
        let mut channels = decoded.channels;
        channels.truncate(MAX_CHANNELS);
        for channel in &mut channels {
            channel.truncate(max_frames);
        }
        Self {
            name: name.into(),
            channels,
            source_rate: decoded.sample_rate as f64,
            notes,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn applies_to_note(&self, note: u8) -> bool {
        self.notes.contains(note)
    }

    pub fn root_note(&self) -> u8 {
        self.config.root_note
    }

    pub fn config(&self) -> &SoundConfig {
        &self.config
    }

    pub fn source_rate(&self) -> f64 {
        self.source_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Length in frames.
    pub fn len(&self) -> usize {
        self.channels.iter().map(Vec::len).min().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn channel(&self, index: usize) -> &[f32] {
        self.channels
            .get(index)
            .or_else(|| self.channels.first())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub type SoundList = Vec<Arc<SamplerSound>>;

/// Installed sounds, published to the audio thread without locking.
///
/// Writers build a new list and swap it in; the audio thread takes one
/// snapshot per render call. Loading appends, so a second sample plays
/// alongside the first until [`SoundBank::clear`] is called.
#[derive(Debug, Clone)]
pub struct SoundBank {
    sounds: Arc<ArcSwap<SoundList>>,
}

impl SoundBank {
    pub fn new() -> Self {
        Self {
            sounds: Arc::new(ArcSwap::from_pointee(SoundList::new())),
        }
    }

    pub fn add(&self, sound: SamplerSound) {
        let sound = Arc::new(sound);
        self.sounds.rcu(|current| {
            let mut next = SoundList::clone(current);
            next.push(Arc::clone(&sound));
            next
        });
    }

    /// Builds a sound over the full note range from `decoded`. `None` is a
    /// no-op that leaves the installed sounds alone.
    pub fn load_sample(
        &self,
        name: &str,
        decoded: Option<DecodedSample>,
        config: &SoundConfig,
    ) -> bool {
        match decoded {
            Some(decoded) => {
                self.add(SamplerSound::new(name, decoded, NoteSet::all(), config.clone()));
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        self.sounds.store(Arc::new(SoundList::new()));
    }

    pub fn len(&self) -> usize {
        self.sounds.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock-free read for the audio thread.
    pub fn snapshot(&self) -> Guard<Arc<SoundList>> {
        self.sounds.load()
    }
}

impl Default for SoundBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample data the audio thread held the last reference to.
#[derive(Debug)]
pub enum Retired {
    Sound(Arc<SamplerSound>),
    Sounds(Arc<SoundList>),
}

/// Bounded channel carrying [`Retired`] data from the audio thread to
/// whoever frees it. Sending never allocates.
pub fn retire_queue() -> (Sender<Retired>, Receiver<Retired>) {
    bounded(RETIRE_QUEUE_LEN)
}

/// Queues `sound` if the caller holds its last reference, so dropping it
/// would free the sample. A full or missing queue drops it in place.
pub(crate) fn retire_sound(queue: Option<&Sender<Retired>>, sound: Arc<SamplerSound>) {
    if Arc::strong_count(&sound) == 1 {
        if let Some(queue) = queue {
            let _ = queue.try_send(Retired::Sound(sound));
        }
    }
}

/// Same as [`retire_sound`] for a whole sound list.
pub(crate) fn retire_sounds(queue: Option<&Sender<Retired>>, sounds: Arc<SoundList>) {
    if Arc::strong_count(&sounds) == 1 {
        if let Some(queue) = queue {
            let _ = queue.try_send(Retired::Sounds(sounds));
        }
    }
}
