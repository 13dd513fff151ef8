//! Editor model: the gain slider and the load button, laid out in a fixed
//! size window. Rendering belongs to the host's toolkit.

use std::fmt;
use std::sync::Arc;

use vsthw_engine::PluginEditor;
use vsthw_plugin_sdk::ParameterRange;

use crate::loader::{FileChooser, SampleLoader};
use crate::params::{gain_range, GainParameter};

pub const EDITOR_WIDTH: u32 = 400;
pub const EDITOR_HEIGHT: u32 = 300;

const SLIDER_WIDTH: i32 = 100;
const SLIDER_HEIGHT: i32 = 150;
const TEXT_BOX_WIDTH: u32 = 50;
const TEXT_BOX_HEIGHT: u32 = 20;
const BUTTON_HEIGHT: i32 = 30;
const BUTTON_GAP: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderStyle {
    LinearVertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBoxPosition {
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBox {
    pub position: TextBoxPosition,
    pub read_only: bool,
    pub width: u32,
    pub height: u32,
}

type ValueListener = Box<dyn FnMut(f32) + Send>;

/// Vertical slider over the gain range.
pub struct GainSlider {
    range: ParameterRange,
    value: f32,
    style: SliderStyle,
    text_box: TextBox,
    bounds: Rect,
    listener: Option<ValueListener>,
}

impl GainSlider {
    pub fn new() -> Self {
        let range = gain_range();
        Self {
            value: range.default,
            range,
            style: SliderStyle::LinearVertical,
            text_box: TextBox {
                position: TextBoxPosition::Below,
                read_only: true,
                width: TEXT_BOX_WIDTH,
                height: TEXT_BOX_HEIGHT,
            },
            bounds: Rect::default(),
            listener: None,
        }
    }

    pub fn range(&self) -> (f32, f32) {
        (self.range.min, self.range.max)
    }

    pub fn interval(&self) -> Option<f32> {
        self.range.step
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn style(&self) -> SliderStyle {
        self.style
    }

    pub fn text_box(&self) -> TextBox {
        self.text_box
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    /// Text shown in the box below the slider.
    pub fn display_text(&self) -> String {
        format!("{:.2}", self.value)
    }

    /// Thumb position, 0.0 at the bottom of the track.
    pub fn proportion(&self) -> f32 {
        self.range.normalize(self.value)
    }

    pub fn set_proportion(&mut self, proportion: f32) {
        self.set_value(self.range.denormalize(proportion));
    }

    pub fn on_value_change(&mut self, listener: impl FnMut(f32) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Snaps `value` into range and notifies the listener if it moved.
    pub fn set_value(&mut self, value: f32) {
        if !value.is_finite() {
            return;
        }
        let value = self.range.constrain(value);
        if value == self.value {
            return;
        }
        self.value = value;
        if let Some(listener) = self.listener.as_mut() {
            listener(value);
        }
    }
}

impl Default for GainSlider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GainSlider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GainSlider")
            .field("value", &self.value)
            .field("style", &self.style)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

type ClickHandler = Box<dyn FnMut() + Send>;

pub struct LoadButton {
    label: String,
    bounds: Rect,
    on_click: Option<ClickHandler>,
}

impl LoadButton {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bounds: Rect::default(),
            on_click: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn on_click(&mut self, handler: impl FnMut() + Send + 'static) {
        self.on_click = Some(Box::new(handler));
    }

    pub fn click(&mut self) {
        if let Some(handler) = self.on_click.as_mut() {
            handler();
        }
    }
}

impl fmt::Debug for LoadButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadButton")
            .field("label", &self.label)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

/// The plug-in window.
///
/// Moving the slider writes straight into the shared gain; clicking the
/// button asks the file chooser for a sample and queues it on the loader.
#[derive(Debug)]
pub struct VstHwEditor {
    width: u32,
    height: u32,
    slider: GainSlider,
    button: LoadButton,
}

impl VstHwEditor {
    pub fn new(
        gain: GainParameter,
        loader: Arc<SampleLoader>,
        chooser: Arc<dyn FileChooser>,
    ) -> Self {
        let mut slider = GainSlider::new();
        slider.set_value(gain.get());
        slider.on_value_change(move |db| gain.set(db));

        let mut button = LoadButton::new("Load");
        button.on_click(move || {
            if let Err(err) = loader.load_from_chooser(chooser.as_ref()) {
                tracing::warn!("could not queue sample load: {err}");
            }
        });

        let mut editor = Self {
            width: EDITOR_WIDTH,
            height: EDITOR_HEIGHT,
            slider,
            button,
        };
        editor.resized(EDITOR_WIDTH, EDITOR_HEIGHT);
        editor
    }

    pub fn slider(&self) -> &GainSlider {
        &self.slider
    }

    pub fn slider_mut(&mut self) -> &mut GainSlider {
        &mut self.slider
    }

    pub fn load_button(&self) -> &LoadButton {
        &self.button
    }

    pub fn load_button_mut(&mut self) -> &mut LoadButton {
        &mut self.button
    }
}

impl PluginEditor for VstHwEditor {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resized(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let x = width as i32 / 2 - SLIDER_WIDTH / 2;
        let y = height as i32 / 2;
        self.slider
            .set_bounds(Rect::new(x, y, SLIDER_WIDTH, SLIDER_HEIGHT));
        self.button.set_bounds(Rect::new(
            x,
            y - BUTTON_GAP - BUTTON_HEIGHT,
            SLIDER_WIDTH,
            BUTTON_HEIGHT,
        ));
    }
}
