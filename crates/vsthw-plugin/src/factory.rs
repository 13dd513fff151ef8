use std::sync::Arc;

use vsthw_engine::PluginDescriptor;
use vsthw_plugin_sdk::{NativePlugin, ParameterLayout, PluginFactory};

use crate::config::PluginConfig;
use crate::params::gain_layout;
use crate::processor::{self, VstHwProcessor};

/// Builds [`VstHwProcessor`] instances for the host.
#[derive(Debug, Clone, Default)]
pub struct VstHwFactory {
    config: PluginConfig,
}

impl VstHwFactory {
    pub fn new(config: PluginConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }
}

impl PluginFactory for VstHwFactory {
    fn descriptor(&self) -> PluginDescriptor {
        processor::descriptor()
    }

    fn parameter_layout(&self) -> Arc<ParameterLayout> {
        Arc::new(gain_layout())
    }

    fn create(&self) -> Box<dyn NativePlugin> {
        tracing::info!(voices = self.config.sampler.voices, "creating VstHw instance");
        Box::new(VstHwProcessor::new(self.config.clone()))
    }
}
