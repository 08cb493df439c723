//! Feature extraction and encoding
//!
//! Converts a raw form submission into the model's input row.

pub mod aligned;
pub mod encoding;
pub mod temporal;

pub use aligned::{build, AlignedFeatureVector, FEATURE_NAMES};
pub use temporal::DateParts;
