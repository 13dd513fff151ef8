#![deny(unsafe_op_in_unsafe_fn)]

//! Small DSP toolkit used by the VstHw processor: decibel conversion, the
//! in-place gain stage and a scoped denormal guard for the audio callback.

pub mod denormals;
pub mod gain;

pub use denormals::NoDenormalsGuard;
pub use gain::{apply_gain, db_to_linear, Gain};
