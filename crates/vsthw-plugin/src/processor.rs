use std::sync::Arc;

use vsthw_dsp::{apply_gain, NoDenormalsGuard};
use vsthw_engine::{
    AudioBuffer, AudioProcessor, BufferConfig, BusesLayout, MidiEvent, PluginDescriptor,
    PluginEditor, PluginError,
};
use vsthw_plugin_sdk::{NativePlugin, ParameterId, ParameterLayout, PluginParameterError};

use crate::config::PluginConfig;
use crate::editor::VstHwEditor;
use crate::loader::{DocumentsFileChooser, FileChooser, LoadHandle, SampleLoadError, SampleLoader};
use crate::params::{gain_layout, GainParameter, GAIN_PARAM};
use crate::sampler::{retire_queue, SoundBank, Synthesiser};

pub const PLUGIN_ID: &str = "vsthw.sampler";
pub const PLUGIN_NAME: &str = "VstHw";

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::new(PLUGIN_ID, PLUGIN_NAME, "VstHw")
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_description("Input gain with a sample-playback instrument mixed on top")
}

/// Gain stage followed by a polyphonic sampler.
///
/// Each block: channels without a matching input are cleared, the input
/// channels are scaled by the current gain, then the sampler adds its
/// voices on top.
pub struct VstHwProcessor {
    config: PluginConfig,
    buffer_config: Option<BufferConfig>,
    gain: GainParameter,
    synth: Synthesiser,
    loader: Arc<SampleLoader>,
    file_chooser: Arc<dyn FileChooser>,
    layout: ParameterLayout,
}

impl VstHwProcessor {
    pub fn new(config: PluginConfig) -> Self {
        Self::with_file_chooser(config, Arc::new(DocumentsFileChooser::new()))
    }

    pub fn with_file_chooser(config: PluginConfig, file_chooser: Arc<dyn FileChooser>) -> Self {
        let bank = SoundBank::new();
        let (retire, retired) = retire_queue();
        let mut synth = Synthesiser::new(&config.sampler, bank.clone());
        synth.set_retire_queue(retire);
        let loader = Arc::new(
            SampleLoader::new(bank, config.sampler.sound.clone()).with_retired(retired),
        );
        Self {
            config,
            buffer_config: None,
            gain: GainParameter::default(),
            synth,
            loader,
            file_chooser,
            layout: gain_layout(),
        }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn buffer_config(&self) -> Option<&BufferConfig> {
        self.buffer_config.as_ref()
    }

    pub fn gain_parameter(&self) -> &GainParameter {
        &self.gain
    }

    pub fn synth(&self) -> &Synthesiser {
        &self.synth
    }

    pub fn sample_loader(&self) -> &Arc<SampleLoader> {
        &self.loader
    }

    pub fn file_chooser(&self) -> &Arc<dyn FileChooser> {
        &self.file_chooser
    }

    /// Asks `chooser` for a sample and queues it. Nothing happens when the
    /// user cancels.
    pub fn load_file(
        &self,
        chooser: &dyn FileChooser,
    ) -> Result<Option<LoadHandle>, SampleLoadError> {
        self.loader.load_from_chooser(chooser)
    }
}

impl Default for VstHwProcessor {
    fn default() -> Self {
        Self::new(PluginConfig::default())
    }
}

impl AudioProcessor for VstHwProcessor {
    fn descriptor(&self) -> PluginDescriptor {
        descriptor()
    }

    fn prepare(&mut self, config: &BufferConfig) -> anyhow::Result<()> {
        let buses = config.buses();
        if !self.supports_layout(&buses) {
            return Err(PluginError::UnsupportedLayout(buses).into());
        }
        if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
            return Err(PluginError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                config.sample_rate
            ))
            .into());
        }
        self.synth.configure(config.sample_rate as f64);
        self.buffer_config = Some(config.clone());
        tracing::debug!(
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            inputs = config.input_channels(),
            outputs = config.output_channels(),
            "prepared VstHw"
        );
        Ok(())
    }

    fn process(&mut self, buffer: &mut AudioBuffer, midi: &[MidiEvent]) -> anyhow::Result<()> {
        let Some(config) = self.buffer_config.as_ref() else {
            return Err(PluginError::NotPrepared.into());
        };
        let _denormals = NoDenormalsGuard::new();
        let inputs = config.input_channels();

        for index in inputs..buffer.num_channels() {
            buffer.clear_channel(index);
        }
        apply_gain(buffer.as_mut_slice(), inputs, self.gain.get());

        let len = buffer.len();
        self.synth.render(buffer, midi, 0, len);
        Ok(())
    }

    fn release_resources(&mut self) {
        self.loader.collect_retired();
    }

    fn supports_layout(&self, layout: &BusesLayout) -> bool {
        if !layout.main_output.is_mono_or_stereo() {
            return false;
        }
        self.config.is_synth || layout.main_input == layout.main_output
    }

    fn accepts_midi(&self) -> bool {
        true
    }

    fn has_editor(&self) -> bool {
        true
    }

    fn create_editor(&mut self) -> Option<Box<dyn PluginEditor>> {
        Some(Box::new(VstHwEditor::new(
            self.gain.clone(),
            Arc::clone(&self.loader),
            Arc::clone(&self.file_chooser),
        )))
    }

    // Nothing is persisted yet; the host gets an empty blob back.
    fn get_state(&self) -> Vec<u8> {
        Vec::new()
    }

    fn set_state(&mut self, _data: &[u8]) {}
}

impl NativePlugin for VstHwProcessor {
    fn parameter_layout(&self) -> &ParameterLayout {
        &self.layout
    }

    fn parameter_value(&self, id: &ParameterId) -> Result<f32, PluginParameterError> {
        match id.as_str() {
            GAIN_PARAM => Ok(self.gain.get()),
            _ => Err(PluginParameterError::UnknownParameter(id.clone())),
        }
    }

    fn on_parameter_changed(&mut self, id: &ParameterId, value: f32) {
        if id.as_str() == GAIN_PARAM {
            self.gain.set(value);
        }
    }
}
