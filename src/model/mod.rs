//! Model Handle: the capability contract every loaded classifier satisfies.
//!
//! - [`loader`]: artifact deserialization and load-time validation
//! - [`logistic`]: logistic regression predictor
//! - [`forest`]: decision-tree ensemble predictor
//!
//! The service only ever talks to a [`Classifier`]; which predictor family
//! backs it is decided by the artifact on disk.

pub mod forest;
pub mod loader;
pub mod logistic;

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

/// A class label as emitted by the classifier.
pub type ClassLabel = i64;

/// One input row: feature name to raw value.
pub type FeatureRecord = BTreeMap<String, FeatureValue>;

/// Request-level inference failures raised while shaping or scoring a frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Input frame contains no rows")]
    EmptyFrame,

    #[error("Missing features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    #[error("Unexpected features: {}", .0.join(", "))]
    UnexpectedFeatures(Vec<String>),

    #[error("Input contains a missing value for feature '{0}'")]
    MissingValue(String),

    #[error("could not convert string to float: '{value}' (feature '{feature}')")]
    NotConvertible { feature: String, value: String },

    #[error("Feature '{0}' must be a scalar value")]
    NotScalar(String),

    #[error("Input contains infinity or a value too large for feature '{0}'")]
    NonFinite(String),

    #[error("Decision tree {0} is malformed")]
    MalformedTree(usize),

    #[error("Model produced no class probabilities for row {0}")]
    EmptyDistribution(usize),

    #[error("Model score for row {0} is not a number")]
    UndefinedScore(usize),

    #[error("Model produced an invalid probability for row {0}")]
    InvalidProbability(usize),
}

/// A raw feature value, before numeric conversion by the model.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Arrays and objects. Carried through so the model can reject them.
    Composite(Value),
}

impl FeatureValue {
    /// Convert to a finite float the way a tabular numeric cast does.
    ///
    /// Numeric strings are accepted since browser forms submit every field
    /// as text.
    pub fn to_f64(&self, feature: &str) -> Result<f64, ModelError> {
        let x = match self {
            FeatureValue::Missing => return Err(ModelError::MissingValue(feature.to_string())),
            FeatureValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            FeatureValue::Number(n) => *n,
            FeatureValue::Text(s) => {
                s.trim()
                    .parse::<f64>()
                    .map_err(|_| ModelError::NotConvertible {
                        feature: feature.to_string(),
                        value: s.clone(),
                    })?
            }
            FeatureValue::Composite(_) => return Err(ModelError::NotScalar(feature.to_string())),
        };

        if x.is_nan() {
            return Err(ModelError::MissingValue(feature.to_string()));
        }
        if !x.is_finite() {
            return Err(ModelError::NonFinite(feature.to_string()));
        }
        Ok(x)
    }
}

impl From<Value> for FeatureValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FeatureValue::Missing,
            Value::Bool(b) => FeatureValue::Bool(b),
            Value::Number(n) => n.as_f64().map_or(FeatureValue::Missing, FeatureValue::Number),
            Value::String(s) => FeatureValue::Text(s),
            other => FeatureValue::Composite(other),
        }
    }
}

/// Rows presented to a classifier. Columns are matched by name, so the
/// order in which a record lists its features is irrelevant.
#[derive(Debug, Clone, Default)]
pub struct FeatureFrame {
    rows: Vec<FeatureRecord>,
}

impl FeatureFrame {
    /// Wrap a single record into a one-row frame.
    pub fn single(record: FeatureRecord) -> Self {
        Self { rows: vec![record] }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Project every row onto `columns`, in that order, as floats.
    ///
    /// Every row must carry exactly the expected feature set.
    pub fn to_matrix(&self, columns: &[String]) -> Result<Vec<Vec<f64>>, ModelError> {
        if self.is_empty() {
            return Err(ModelError::EmptyFrame);
        }

        self.rows
            .iter()
            .map(|row| {
                let missing: Vec<String> = columns
                    .iter()
                    .filter(|c| !row.contains_key(c.as_str()))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    return Err(ModelError::MissingFeatures(missing));
                }

                let unexpected: Vec<String> = row
                    .keys()
                    .filter(|k| !columns.contains(*k))
                    .cloned()
                    .collect();
                if !unexpected.is_empty() {
                    return Err(ModelError::UnexpectedFeatures(unexpected));
                }

                columns
                    .iter()
                    .map(|c| row[c.as_str()].to_f64(c))
                    .collect::<Result<Vec<f64>, ModelError>>()
            })
            .collect()
    }
}

/// Label and class distribution for one row, produced by a single scoring
/// pass so the two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: ClassLabel,
    /// Probability per class, aligned with [`Classifier::classes`].
    pub distribution: Vec<f64>,
}

impl Classification {
    /// Pick the most probable class. Ties go to the earlier class.
    pub fn from_distribution(classes: &[ClassLabel], distribution: Vec<f64>) -> Option<Self> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, &p) in distribution.iter().enumerate() {
            match best {
                Some((_, best_p)) if p <= best_p => {}
                _ => best = Some((idx, p)),
            }
        }

        let (idx, _) = best?;
        let label = *classes.get(idx)?;
        Some(Self {
            label,
            distribution,
        })
    }
}

/// The loaded predictor.
///
/// Implementations are immutable once constructed and are shared read-only
/// across request tasks.
pub trait Classifier: Send + Sync {
    /// Short name of the predictor family, e.g. `"logistic_regression"`.
    fn kind(&self) -> &'static str;

    /// Class labels, in the order the probability columns are emitted.
    fn classes(&self) -> &[ClassLabel];

    /// Feature names the predictor expects on every row.
    fn feature_names(&self) -> &[String];

    /// Probability distribution over [`Classifier::classes`] for every row.
    fn predict_proba(&self, frame: &FeatureFrame) -> Result<Vec<Vec<f64>>, ModelError>;

    /// Most probable class label for every row.
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<ClassLabel>, ModelError> {
        Ok(self
            .classify(frame)?
            .into_iter()
            .map(|c| c.label)
            .collect())
    }

    /// Label and distribution for every row from one scoring pass.
    fn classify(&self, frame: &FeatureFrame) -> Result<Vec<Classification>, ModelError> {
        let classes = self.classes();
        self.predict_proba(frame)?
            .into_iter()
            .enumerate()
            .map(|(row, dist)| {
                if dist.iter().any(|p| !(0.0..=1.0).contains(p)) {
                    return Err(ModelError::InvalidProbability(row));
                }
                Classification::from_distribution(classes, dist)
                    .ok_or(ModelError::EmptyDistribution(row))
            })
            .collect()
    }
}
