//! Model inference for forecasts

use std::path::Path;
use std::sync::Arc;

use crate::features::{build, AlignedFeatureVector, FEATURE_NAMES};
use crate::model::Booster;
use crate::{ForecastError, Prediction, RawRecord, Result};

/// Handle to the loaded model
///
/// Created once at startup and passed to every prediction. Cloning shares
/// the same immutable model.
#[derive(Debug, Clone)]
pub struct Predictor {
    model: Arc<Booster>,
}

impl Predictor {
    /// Create a new predictor
    pub fn new(model: Booster) -> Self {
        Predictor {
            model: Arc::new(model),
        }
    }

    /// Load predictor from a saved model
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Booster::load(model_path).map(Self::new)
    }

    /// Predict units sold for an aligned feature row
    pub fn predict(&self, features: &AlignedFeatureVector) -> Result<Prediction> {
        self.check_feature_names()?;

        let raw = self.model.predict(&features.to_vec())?;
        if raw < 0.0 {
            log::warn!("Model returned a negative forecast ({:.3})", raw);
        }
        Ok(Prediction::new(raw))
    }

    /// Build the feature row for a submission and predict
    pub fn forecast(&self, record: &RawRecord) -> Result<Prediction> {
        let features = build(record)?;
        log::debug!("Feature row: {:?}", features.to_vec());
        self.predict(&features)
    }

    /// Models saved with feature names must list ours, in our order
    fn check_feature_names(&self) -> Result<()> {
        let names = self.model.feature_names();
        if names.is_empty() {
            return Ok(());
        }
        let mismatch = names
            .iter()
            .zip(FEATURE_NAMES.iter())
            .position(|(model_name, ours)| model_name != ours);
        match (names.len() == FEATURE_NAMES.len(), mismatch) {
            (true, None) => Ok(()),
            (_, Some(i)) => Err(ForecastError::Prediction(format!(
                "feature_names mismatch at column {}: model expects '{}', got '{}'",
                i, names[i], FEATURE_NAMES[i]
            ))),
            (false, None) => Err(ForecastError::Prediction(format!(
                "feature_names mismatch: model expects {} columns, got {}",
                names.len(),
                FEATURE_NAMES.len()
            ))),
        }
    }

    /// Get the model
    pub fn model(&self) -> &Booster {
        &self.model
    }
}

/// Format a prediction for display
pub fn format_prediction(pred: &Prediction, record: &RawRecord) -> String {
    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} in {} on {}
├─────────────────────────────────────────────────┤
│  Forecast units sold:  {}
│  Price / competitor:   {:.2} / {:.2}
│  Discount:             {}%{}
└─────────────────────────────────────────────────┘
"#,
        record.category,
        record.region,
        record.date.trim(),
        pred.units(),
        record.price,
        record.competitor_pricing,
        record.discount,
        if record.holiday_promotion {
            " (holiday/promotion)"
        } else {
            ""
        }
    )
}

/// Remediation hint shown next to prediction failures
pub fn prediction_hint(model_path: &str) -> String {
    format!(
        "Check that the model file '{}' exists and was trained on the {} expected columns.",
        model_path,
        AlignedFeatureVector::DIM
    )
}
