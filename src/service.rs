//! Inference service: turns a request body into a prediction.
//!
//! Owns the loaded Model Handle and the positive-class lookup. Every failure
//! on the request path surfaces as a [`PredictError`]; the HTTP layer maps
//! it to a response.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::loader::LoadError;
use crate::model::{ClassLabel, Classifier, FeatureFrame, FeatureRecord, FeatureValue, ModelError};

/// Successful prediction as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 1 when the model's label is the positive class, otherwise 0.
    #[serde(rename = "Diabetes")]
    pub diabetes: u8,

    /// Probability mass assigned to the positive class.
    #[serde(rename = "Probability")]
    pub probability: f64,
}

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Failed to read request body: {0}")]
    UnreadableBody(String),

    #[error("Failed to decode JSON object: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Request body must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Model returned no prediction for the input row")]
    NoPrediction,
}

/// The Ready-state service. Only constructible from a loaded model.
pub struct InferenceService {
    model: Arc<dyn Classifier>,
    positive_class: ClassLabel,
    positive_index: usize,
}

impl InferenceService {
    /// Bind a loaded model to the positive class whose probability is reported.
    pub fn new(model: Arc<dyn Classifier>, positive_class: ClassLabel) -> Result<Self, LoadError> {
        let positive_index = model
            .classes()
            .iter()
            .position(|c| *c == positive_class)
            .ok_or_else(|| LoadError::UnknownPositiveClass(positive_class, model.classes().to_vec()))?;

        Ok(Self {
            model,
            positive_class,
            positive_index,
        })
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    /// Parse a raw request body and predict on it.
    pub fn predict_json(&self, body: &[u8]) -> Result<Prediction, PredictError> {
        let value: Value = serde_json::from_slice(body)?;
        self.predict(record_from_json(value)?)
    }

    /// Predict on a single feature record.
    pub fn predict(&self, record: FeatureRecord) -> Result<Prediction, PredictError> {
        debug!(features = record.len(), "Scoring record");

        let frame = FeatureFrame::single(record);
        let classification = self
            .model
            .classify(&frame)?
            .into_iter()
            .next()
            .ok_or(PredictError::NoPrediction)?;

        let probability = classification
            .distribution
            .get(self.positive_index)
            .copied()
            .ok_or(PredictError::NoPrediction)?;

        info!(
            "Prediction: {}, Probability of Diabetes: {:.4}",
            classification.label, probability
        );

        Ok(Prediction {
            diabetes: u8::from(classification.label == self.positive_class),
            probability,
        })
    }
}

/// Interpret a JSON document as a feature record. Only objects qualify.
pub fn record_from_json(value: Value) -> Result<FeatureRecord, PredictError> {
    match value {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(name, v)| (name, FeatureValue::from(v)))
            .collect()),
        Value::Null => Err(PredictError::NotAnObject("null")),
        Value::Bool(_) => Err(PredictError::NotAnObject("a boolean")),
        Value::Number(_) => Err(PredictError::NotAnObject("a number")),
        Value::String(_) => Err(PredictError::NotAnObject("a string")),
        Value::Array(_) => Err(PredictError::NotAnObject("an array")),
    }
}
