//! VstHw Plugin SDK
//! ================
//!
//! Parameter descriptions and factory registration on top of
//! [`vsthw_engine`]'s [`AudioProcessor`](vsthw_engine::AudioProcessor).

mod parameters;
mod registry;

pub use parameters::{
    ParameterDefinition, ParameterId, ParameterLayout, ParameterRange, PluginParameterError,
};
pub use registry::{NativePlugin, PluginExport, PluginFactory, PluginModule};

/// Common imports for plugin authors.
pub mod prelude {
    pub use crate::{
        NativePlugin, ParameterDefinition, ParameterId, ParameterLayout, ParameterRange,
        PluginExport, PluginFactory, PluginModule, PluginParameterError,
    };
    pub use vsthw_engine::{
        AudioBuffer, AudioProcessor, BufferConfig, BusesLayout, ChannelLayout, MidiEvent,
        PluginDescriptor, PluginEditor,
    };
}

/// Declare the entry point of a plugin module.
///
/// Each argument is an expression evaluating to a [`PluginFactory`]. The host
/// resolves `vsthw_plugin_entrypoint` and walks the returned module; no
/// process-wide registry is involved.
///
/// ```ignore
/// use vsthw_plugin_sdk::{declare_vsthw_plugins, PluginFactory};
///
/// struct MyFactory;
///
/// impl PluginFactory for MyFactory { /* ... */ }
///
/// declare_vsthw_plugins!(MyFactory);
/// ```
#[macro_export]
macro_rules! declare_vsthw_plugins {
    ($($factory:expr),+ $(,)?) => {
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn vsthw_plugin_entrypoint() -> $crate::PluginExport {
            let mut module = $crate::PluginModule::new();
            $(module.register_factory(Box::new($factory));)+
            $crate::PluginExport::new(module)
        }
    };
}
