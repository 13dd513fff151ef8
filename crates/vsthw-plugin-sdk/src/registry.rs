use std::sync::Arc;

use vsthw_engine::{AudioProcessor, PluginDescriptor};

use crate::{ParameterId, ParameterLayout, PluginParameterError};

/// A processor that also exposes host-automatable parameters.
pub trait NativePlugin: AudioProcessor {
    fn parameter_layout(&self) -> &ParameterLayout;

    /// Current plain value of `id`.
    fn parameter_value(&self, id: &ParameterId) -> Result<f32, PluginParameterError>;

    /// Validates `value` against the layout before handing it to
    /// [`NativePlugin::on_parameter_changed`].
    fn set_parameter(&mut self, id: &ParameterId, value: f32) -> Result<(), PluginParameterError> {
        self.parameter_layout().validate(id, value)?;
        self.on_parameter_changed(id, value);
        Ok(())
    }

    /// Called with values that already passed validation.
    fn on_parameter_changed(&mut self, _id: &ParameterId, _value: f32) {}

    /// Sets `id` from a host-normalised `0.0..=1.0` position.
    fn set_parameter_normalized(
        &mut self,
        id: &ParameterId,
        normalized: f32,
    ) -> Result<(), PluginParameterError> {
        let value = self
            .parameter_layout()
            .find(id)
            .ok_or_else(|| PluginParameterError::UnknownParameter(id.clone()))?
            .range
            .denormalize(normalized);
        self.set_parameter(id, value)
    }
}

/// Creates plugin instances on behalf of the host.
pub trait PluginFactory: Send + Sync {
    fn descriptor(&self) -> PluginDescriptor;
    fn parameter_layout(&self) -> Arc<ParameterLayout>;
    fn create(&self) -> Box<dyn NativePlugin>;
}

#[derive(Default)]
pub struct PluginModule {
    factories: Vec<Box<dyn PluginFactory>>,
}

impl PluginModule {
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    pub fn register_factory(&mut self, factory: Box<dyn PluginFactory>) -> &mut Self {
        self.factories.push(factory);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn PluginFactory> {
        self.factories.iter().map(|factory| factory.as_ref())
    }

    pub fn find(&self, id: &str) -> Option<&dyn PluginFactory> {
        self.iter().find(|factory| factory.descriptor().id == id)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn into_factories(self) -> Vec<Box<dyn PluginFactory>> {
        self.factories
    }
}

/// Value returned from the module entry point.
pub struct PluginExport {
    module: PluginModule,
}

impl PluginExport {
    pub fn new(module: PluginModule) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &PluginModule {
        &self.module
    }

    pub fn into_module(self) -> PluginModule {
        self.module
    }
}
