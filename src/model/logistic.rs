//! Binary logistic regression.
//!
//! ```text
//! z_i = (x_i - mean_i) / scale_i          (when a scaler is present)
//! P(classes[1]) = sigmoid(intercept + Σ coef_i · z_i)
//! ```

use serde::{Deserialize, Serialize};

use crate::model::loader::{ensure_finite, validate_header, LoadError};
use crate::model::{ClassLabel, Classifier, FeatureFrame, ModelError};

/// Per-feature standardisation applied before the linear term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    classes: Vec<ClassLabel>,
    features: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scaler: Option<Scaler>,
}

impl LogisticRegression {
    /// Build and validate a model.
    pub fn new(
        classes: Vec<ClassLabel>,
        features: Vec<String>,
        coefficients: Vec<f64>,
        intercept: f64,
        scaler: Option<Scaler>,
    ) -> Result<Self, LoadError> {
        let model = Self {
            classes,
            features,
            coefficients,
            intercept,
            scaler,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        validate_header(&self.classes, &self.features)?;

        let n = self.features.len();
        if self.coefficients.len() != n {
            return Err(LoadError::InvalidModel(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                n
            )));
        }
        ensure_finite("coefficients", &self.coefficients)?;
        ensure_finite("intercept", &[self.intercept])?;

        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err(LoadError::InvalidModel(format!(
                    "scaler shape ({}, {}) does not match {} features",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    n
                )));
            }
            ensure_finite("scaler.mean", &scaler.mean)?;
            ensure_finite("scaler.scale", &scaler.scale)?;
            if let Some(idx) = scaler.scale.iter().position(|s| *s == 0.0) {
                return Err(LoadError::InvalidModel(format!("scaler.scale[{idx}] is zero")));
            }
        }

        Ok(())
    }

    /// Raw linear score for one row, in feature order.
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        let dot: f64 = match &self.scaler {
            Some(scaler) => row
                .iter()
                .zip(&self.coefficients)
                .zip(scaler.mean.iter().zip(&scaler.scale))
                .map(|((x, c), (m, s))| c * (x - m) / s)
                .sum(),
            None => row.iter().zip(&self.coefficients).map(|(x, c)| c * x).sum(),
        };
        dot + self.intercept
    }
}

/// Logistic function, split by sign to avoid overflow in `exp`.
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict_proba(&self, frame: &FeatureFrame) -> Result<Vec<Vec<f64>>, ModelError> {
        let matrix = frame.to_matrix(&self.features)?;
        matrix
            .iter()
            .enumerate()
            .map(|(i, row)| {
                // Finite inputs can still overflow the linear term.
                let z = self.decision_function(row);
                if z.is_nan() {
                    return Err(ModelError::UndefinedScore(i));
                }
                let p = sigmoid(z);
                Ok(vec![1.0 - p, p])
            })
            .collect()
    }
}
