//! Sample decoding and the background loader that feeds the sound bank.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{never, select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::config::SoundConfig;
use crate::sampler::{Retired, SoundBank};

const MAX_CHANNELS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum SampleLoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Symphonia(#[from] SymphoniaError),
    #[error("no supported audio tracks found in {0}")]
    NoSupportedTracks(String),
    #[error("missing sample rate for {0}")]
    MissingSampleRate(String),
    #[error("{0} contains no audio")]
    Empty(String),
    #[error("sample loader worker terminated")]
    WorkerExited,
}

/// Decoded audio, one `Vec` per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSample {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedSample {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn append_interleaved(&mut self, data: &[f32], source_channels: usize) {
        if source_channels == 0 {
            return;
        }
        let channels = source_channels.min(MAX_CHANNELS);
        if self.channels.len() < channels {
            self.channels.resize(channels, Vec::new());
        }
        for frame in data.chunks(source_channels) {
            for (ch, sample) in frame.iter().take(channels).enumerate() {
                self.channels[ch].push(*sample);
            }
        }
    }
}

/// Decodes a WAV or MP3 file, keeping at most two channels.
pub fn decode_file(path: impl AsRef<Path>) -> Result<DecodedSample, SampleLoadError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    decode_reader(file, Some(path))
}

pub fn decode_reader<R>(reader: R, hint_path: Option<&Path>) -> Result<DecodedSample, SampleLoadError>
where
    R: MediaSource + 'static,
{
    let display_name = hint_path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<stream>".to_string());
    let mss = MediaSourceStream::new(Box::new(reader), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = hint_path
        .and_then(|path| path.extension())
        .and_then(|ext| ext.to_str())
    {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;
    let (codec_params, track_id) = {
        let track = format
            .default_track()
            .ok_or_else(|| SampleLoadError::NoSupportedTracks(display_name.clone()))?;
        (track.codec_params.clone(), track.id)
    };
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| SampleLoadError::MissingSampleRate(display_name.clone()))?;
    let mut decoder =
        symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

    let mut decoded = DecodedSample {
        sample_rate,
        channels: Vec::new(),
    };
    let mut scratch: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(buffer) => {
                let spec = *buffer.spec();
                let channels = spec.channels.count();
                let scratch = scratch.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(buffer.capacity() as u64, spec)
                });
                if (scratch.capacity() as u64) < buffer.capacity() as u64 * channels as u64 {
                    *scratch = SampleBuffer::<f32>::new(buffer.capacity() as u64, spec);
                }
                scratch.copy_interleaved_ref(buffer);
                decoded.append_interleaved(scratch.samples(), channels);
            }
            // Corrupt frames are skipped rather than failing the whole file.
            Err(SymphoniaError::DecodeError(_)) => {}
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    if decoded.frames() == 0 {
        return Err(SampleLoadError::Empty(display_name));
    }
    Ok(decoded)
}

/// Source of user-picked sample paths.
pub trait FileChooser: Send + Sync {
    fn browse_for_file(&self) -> Option<PathBuf>;
}

/// Chooser rooted in the user's documents folder, filtered to `*.wav; *.mp3`.
///
/// There is no dialog behind it: whatever UI the host embeds hands the
/// picked path over with [`DocumentsFileChooser::select`].
#[derive(Debug)]
pub struct DocumentsFileChooser {
    title: String,
    initial_dir: PathBuf,
    patterns: Vec<String>,
    selection: Mutex<Option<PathBuf>>,
}

impl DocumentsFileChooser {
    pub fn new() -> Self {
        let initial_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::with_dir(initial_dir)
    }

    pub fn with_dir(initial_dir: impl Into<PathBuf>) -> Self {
        Self {
            title: "Please load file".to_string(),
            initial_dir: initial_dir.into(),
            patterns: parse_patterns("*.wav; *.mp3"),
            selection: Mutex::new(None),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn initial_dir(&self) -> &Path {
        &self.initial_dir
    }

    /// Records the path the user picked. Relative paths are resolved
    /// against the initial directory.
    pub fn select(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let path = if path.is_relative() {
            self.initial_dir.join(path)
        } else {
            path
        };
        *self.selection.lock() = Some(path);
    }

    pub fn accepts(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.eq_ignore_ascii_case(ext))
    }
}

impl Default for DocumentsFileChooser {
    fn default() -> Self {
        Self::new()
    }
}

impl FileChooser for DocumentsFileChooser {
    fn browse_for_file(&self) -> Option<PathBuf> {
        self.selection
            .lock()
            .take()
            .filter(|path| self.accepts(path))
    }
}

/// `"*.wav; *.mp3"` -> `["wav", "mp3"]`
fn parse_patterns(filter: &str) -> Vec<String> {
    filter
        .split(';')
        .map(str::trim)
        .filter_map(|pattern| pattern.strip_prefix("*."))
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
        .collect()
}

enum LoadCommand {
    Load {
        path: PathBuf,
        responder: Sender<Result<(), SampleLoadError>>,
    },
    Shutdown,
}

struct LoaderShared {
    bank: SoundBank,
    config: SoundConfig,
    last_error: Mutex<Option<String>>,
}

impl LoaderShared {
    fn load(&self, path: &Path) -> Result<(), SampleLoadError> {
        match decode_file(path) {
            Ok(decoded) => {
                let name = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or("Sample");
                let frames = decoded.frames();
                let sample_rate = decoded.sample_rate;
                self.bank.load_sample(name, Some(decoded), &self.config);
                *self.last_error.lock() = None;
                tracing::info!(
                    path = %path.display(),
                    frames,
                    sample_rate,
                    sounds = self.bank.len(),
                    "loaded sample"
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), "failed to load sample: {err}");
                *self.last_error.lock() = Some(err.to_string());
                Err(err)
            }
        }
    }
}

struct Worker {
    commands: Sender<LoadCommand>,
    handle: Option<JoinHandle<()>>,
}

/// Decodes samples off the audio thread and installs them into a
/// [`SoundBank`].
///
/// The worker thread is started on the first request and stopped when the
/// loader is dropped. A failed load leaves the bank as it was. With a
/// retire queue attached the worker also frees the sounds the audio thread
/// let go of.
pub struct SampleLoader {
    shared: Arc<LoaderShared>,
    worker: Mutex<Option<Worker>>,
    retired: Option<Receiver<Retired>>,
}

impl SampleLoader {
    pub fn new(bank: SoundBank, config: SoundConfig) -> Self {
        Self {
            shared: Arc::new(LoaderShared {
                bank,
                config,
                last_error: Mutex::new(None),
            }),
            worker: Mutex::new(None),
            retired: None,
        }
    }

    /// Takes the receiving end of the synthesiser's retire queue.
    pub fn with_retired(mut self, retired: Receiver<Retired>) -> Self {
        self.retired = Some(retired);
        self
    }

    /// Frees whatever is waiting in the retire queue on the calling thread.
    /// Returns how many items were dropped.
    pub fn collect_retired(&self) -> usize {
        self.retired
            .as_ref()
            .map_or(0, |retired| retired.try_iter().count())
    }

    pub fn bank(&self) -> &SoundBank {
        &self.shared.bank
    }

    /// Message of the most recent failed load, cleared by a successful one.
    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.lock().clone()
    }

    /// Queues `path` for loading. The returned handle may be dropped.
    pub fn request(&self, path: impl Into<PathBuf>) -> Result<LoadHandle, SampleLoadError> {
        self.collect_retired();
        let (responder, receiver) = unbounded();
        let command = LoadCommand::Load {
            path: path.into(),
            responder,
        };
        let mut worker = self.worker.lock();
        if worker.is_none() {
            *worker = Some(self.spawn_worker()?);
        }
        worker
            .as_ref()
            .ok_or(SampleLoadError::WorkerExited)?
            .commands
            .send(command)
            .map_err(|_| SampleLoadError::WorkerExited)?;
        Ok(LoadHandle { receiver })
    }

    /// Loads on the calling thread.
    pub fn load_blocking(&self, path: impl AsRef<Path>) -> Result<(), SampleLoadError> {
        self.collect_retired();
        self.shared.load(path.as_ref())
    }

    /// Asks `chooser` for a file and queues it. Returns `Ok(None)` when the
    /// user picked nothing.
    pub fn load_from_chooser(
        &self,
        chooser: &dyn FileChooser,
    ) -> Result<Option<LoadHandle>, SampleLoadError> {
        match chooser.browse_for_file() {
            Some(path) => self.request(path).map(Some),
            None => Ok(None),
        }
    }

    fn spawn_worker(&self) -> Result<Worker, SampleLoadError> {
        let (commands, receiver) = unbounded();
        let shared = Arc::clone(&self.shared);
        let retired = self.retired.clone().unwrap_or_else(never);
        let handle = thread::Builder::new()
            .name("sample-loader".into())
            .spawn(move || loader_worker(shared, receiver, retired))?;
        Ok(Worker {
            commands,
            handle: Some(handle),
        })
    }
}

impl Drop for SampleLoader {
    fn drop(&mut self) {
        if let Some(mut worker) = self.worker.lock().take() {
            let _ = worker.commands.send(LoadCommand::Shutdown);
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

fn loader_worker(
    shared: Arc<LoaderShared>,
    commands: Receiver<LoadCommand>,
    mut retired: Receiver<Retired>,
) {
    loop {
        let mut exit = false;
        let mut retire_closed = false;
        select! {
            recv(commands) -> command => match command {
                Ok(LoadCommand::Load { path, responder }) => {
                    let result = shared.load(&path);
                    let _ = responder.send(result);
                }
                Ok(LoadCommand::Shutdown) | Err(_) => exit = true,
            },
            // Dropping the item frees it on this thread.
            recv(retired) -> item => retire_closed = item.is_err(),
        }
        if exit {
            break;
        }
        if retire_closed {
            retired = never();
        }
    }
}

/// Completion of a queued load.
pub struct LoadHandle {
    receiver: Receiver<Result<(), SampleLoadError>>,
}

impl LoadHandle {
    pub fn wait(self) -> Result<(), SampleLoadError> {
        self.receiver
            .recv()
            .unwrap_or(Err(SampleLoadError::WorkerExited))
    }
}
