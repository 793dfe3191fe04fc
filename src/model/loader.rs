//! Model artifact loading.
//!
//! Reads the serialized classifier from disk once at startup and validates
//! it before anything is served. Every failure here is fatal to the process.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::model::forest::RandomForest;
use crate::model::logistic::LogisticRegression;
use crate::model::{ClassLabel, Classifier};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Model file not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid model format: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Positive class {0} is not one of the model classes {1:?}")]
    UnknownPositiveClass(ClassLabel, Vec<ClassLabel>),
}

/// On-disk model artifact, tagged by predictor family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
}

impl ModelArtifact {
    /// Deserialize and validate an artifact from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, LoadError> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        match self {
            ModelArtifact::LogisticRegression(m) => m.validate(),
            ModelArtifact::RandomForest(m) => m.validate(),
        }
    }

    /// Turn the artifact into a shareable Model Handle.
    pub fn into_classifier(self) -> Arc<dyn Classifier> {
        match self {
            ModelArtifact::LogisticRegression(m) => Arc::new(m),
            ModelArtifact::RandomForest(m) => Arc::new(m),
        }
    }
}

/// Load and validate the model artifact at `path`.
pub fn load_model(path: &Path) -> Result<Arc<dyn Classifier>, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    let classifier = ModelArtifact::from_slice(&bytes)?.into_classifier();

    info!(
        path = %path.display(),
        kind = classifier.kind(),
        features = classifier.feature_names().len(),
        classes = ?classifier.classes(),
        "Loaded model"
    );

    Ok(classifier)
}

/// Checks shared by every predictor family: a binary label set and a
/// non-empty, duplicate-free feature list.
pub(crate) fn validate_header(classes: &[ClassLabel], features: &[String]) -> Result<(), LoadError> {
    if classes.len() != 2 || classes[0] == classes[1] {
        return Err(LoadError::InvalidModel(format!(
            "expected exactly two distinct classes, got {classes:?}"
        )));
    }

    if features.is_empty() {
        return Err(LoadError::InvalidModel("feature list is empty".to_string()));
    }

    let mut seen = HashSet::new();
    for name in features {
        if name.is_empty() {
            return Err(LoadError::InvalidModel("empty feature name".to_string()));
        }
        if !seen.insert(name.as_str()) {
            return Err(LoadError::InvalidModel(format!("duplicate feature '{name}'")));
        }
    }

    Ok(())
}

/// Reject NaN and infinite parameters.
pub(crate) fn ensure_finite(what: &str, values: &[f64]) -> Result<(), LoadError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(LoadError::InvalidModel(format!(
            "{what}[{idx}] is not finite"
        ))),
        None => Ok(()),
    }
}
