use std::sync::atomic::Ordering;
use std::sync::Arc;

use atomic_float::AtomicF32;
use vsthw_plugin_sdk::{ParameterDefinition, ParameterLayout, ParameterRange};

pub const GAIN_PARAM: &str = "gain";
pub const GAIN_MIN_DB: f32 = -60.0;
pub const GAIN_MAX_DB: f32 = 0.0;
pub const GAIN_DEFAULT_DB: f32 = -20.0;
pub const GAIN_STEP_DB: f32 = 0.01;

/// Gain in decibels shared between the editor and the audio thread.
///
/// Single writer (UI), single reader (audio). Relaxed ordering is enough:
/// nothing else is published alongside the value.
#[derive(Debug, Clone)]
pub struct GainParameter {
    db: Arc<AtomicF32>,
}

impl GainParameter {
    pub fn new(db: f32) -> Self {
        Self {
            db: Arc::new(AtomicF32::new(db)),
        }
    }

    /// Raw store, no range check.
    pub fn set(&self, db: f32) {
        self.db.store(db, Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        self.db.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.set(GAIN_DEFAULT_DB);
    }
}

impl Default for GainParameter {
    fn default() -> Self {
        Self::new(GAIN_DEFAULT_DB)
    }
}

pub fn gain_range() -> ParameterRange {
    ParameterRange::new(GAIN_MIN_DB..=GAIN_MAX_DB, GAIN_DEFAULT_DB)
        .with_step(GAIN_STEP_DB)
}

pub fn gain_layout() -> ParameterLayout {
    ParameterLayout::new(vec![ParameterDefinition::new(
        GAIN_PARAM,
        "Gain",
        gain_range(),
    )
    .with_unit("dB")
    .with_description("Gain applied to the incoming audio, before the sampler is mixed in")])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_value() {
        let gain = GainParameter::default();
        let editor_side = gain.clone();
        assert_eq!(gain.get(), -20.0);
        editor_side.set(-6.0);
        assert_eq!(gain.get(), -6.0);
        editor_side.reset();
        assert_eq!(gain.get(), GAIN_DEFAULT_DB);
    }

    #[test]
    fn raw_store_is_unconstrained() {
        let gain = GainParameter::default();
        gain.set(12.0);
        assert_eq!(gain.get(), 12.0);
    }
}
