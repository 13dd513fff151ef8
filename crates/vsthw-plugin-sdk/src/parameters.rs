use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterId(String);

impl ParameterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParameterId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounds, default and optional step of a continuous parameter, in plain
/// (unnormalised) units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub step: Option<f32>,
}

impl ParameterRange {
    /// Panics if `range` is inverted or does not contain `default`.
    pub fn new(range: RangeInclusive<f32>, default: f32) -> Self {
        let (min, max) = range.into_inner();
        assert!(min <= max, "parameter min must be <= max");
        assert!((min..=max).contains(&default), "default outside range");
        Self {
            min,
            max,
            default,
            step: None,
        }
    }

    pub fn with_step(mut self, step: f32) -> Self {
        self.step = (step > 0.0).then_some(step);
        self
    }

    /// NaN is never contained.
    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Clamps into range and snaps to the step grid anchored at `min`.
    pub fn constrain(&self, value: f32) -> f32 {
        let clamped = value.clamp(self.min, self.max);
        match self.step {
            Some(step) => {
                let steps = ((clamped - self.min) / step).round();
                (self.min + steps * step).clamp(self.min, self.max)
            }
            None => clamped,
        }
    }

    /// Position of `value` in `0.0..=1.0`, as hosts present automation.
    pub fn normalize(&self, value: f32) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    pub fn denormalize(&self, normalized: f32) -> f32 {
        self.constrain(self.min + normalized.clamp(0.0, 1.0) * (self.max - self.min))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub id: ParameterId,
    pub name: String,
    pub range: ParameterRange,
    pub unit: Option<String>,
    pub description: Option<String>,
}

impl ParameterDefinition {
    pub fn new(id: impl Into<ParameterId>, name: impl Into<String>, range: ParameterRange) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            range,
            unit: None,
            description: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(&self) -> f32 {
        self.range.default
    }

    pub fn validate(&self, value: f32) -> Result<(), PluginParameterError> {
        if !value.is_finite() {
            return Err(PluginParameterError::NotFinite {
                id: self.id.clone(),
                value,
            });
        }
        if !self.range.contains(value) {
            return Err(PluginParameterError::OutOfRange {
                id: self.id.clone(),
                min: self.range.min,
                max: self.range.max,
                value,
            });
        }
        Ok(())
    }
}

/// Every parameter a plugin exposes, in host order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterLayout {
    parameters: Vec<ParameterDefinition>,
}

impl ParameterLayout {
    pub fn new(parameters: Vec<ParameterDefinition>) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    pub fn find(&self, id: &ParameterId) -> Option<&ParameterDefinition> {
        self.parameters
            .iter()
            .find(|definition| &definition.id == id)
    }

    pub fn validate(
        &self,
        id: &ParameterId,
        value: f32,
    ) -> Result<&ParameterDefinition, PluginParameterError> {
        let definition = self
            .find(id)
            .ok_or_else(|| PluginParameterError::UnknownParameter(id.clone()))?;
        definition.validate(value)?;
        Ok(definition)
    }
}

#[derive(Debug, Error)]
pub enum PluginParameterError {
    #[error("unknown parameter `{0}`")]
    UnknownParameter(ParameterId),
    #[error("parameter `{id}` received non-finite value {value}")]
    NotFinite { id: ParameterId, value: f32 },
    #[error("parameter `{id}` received value {value} outside of range {min}..={max}")]
    OutOfRange {
        id: ParameterId,
        min: f32,
        max: f32,
        value: f32,
    },
}
