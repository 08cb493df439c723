//! Prediction and inference
//!
//! Load the trained model and generate forecasts.

pub mod inference;
pub mod session;

pub use inference::Predictor;
pub use session::{FormSession, SessionSummary};
