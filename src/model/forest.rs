//! Decision-tree ensemble.
//!
//! Each tree is a flat node array rooted at index 0. Split nodes send rows
//! with `x[feature] <= threshold` left. Leaves hold a class distribution
//! (raw counts or probabilities). The ensemble probability is the mean of
//! the normalised leaf distributions.

use serde::{Deserialize, Serialize};

use crate::model::loader::{validate_header, LoadError};
use crate::model::{ClassLabel, Classifier, FeatureFrame, ModelError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Children must point strictly forward, which rules out cycles.
    fn validate(&self, tree: usize, n_features: usize, n_classes: usize) -> Result<(), LoadError> {
        let invalid = |msg: String| LoadError::InvalidModel(format!("tree {tree}: {msg}"));

        if self.nodes.is_empty() {
            return Err(invalid("no nodes".to_string()));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(invalid(format!(
                            "node {idx} splits on feature {feature}, model has {n_features}"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(format!("node {idx} threshold is not finite")));
                    }
                    for child in [left, right] {
                        if *child <= idx || *child >= self.nodes.len() {
                            return Err(invalid(format!(
                                "node {idx} has out-of-order child {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(invalid(format!(
                            "leaf {idx} has {} values for {n_classes} classes",
                            value.len()
                        )));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(invalid(format!("leaf {idx} has a negative or non-finite value")));
                    }
                    let total: f64 = value.iter().sum();
                    if !total.is_finite() {
                        return Err(invalid(format!("leaf {idx} sum overflows")));
                    }
                    if total <= 0.0 {
                        return Err(invalid(format!("leaf {idx} is empty")));
                    }
                }
            }
        }

        Ok(())
    }

    /// Walk from the root to the leaf for `row`.
    fn leaf(&self, row: &[f64]) -> Option<&[f64]> {
        let mut idx = 0;
        // A valid tree reaches a leaf in at most `nodes.len()` steps.
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx)? {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if *row.get(*feature)? <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => return Some(value.as_slice()),
            }
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    classes: Vec<ClassLabel>,
    features: Vec<String>,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(
        classes: Vec<ClassLabel>,
        features: Vec<String>,
        trees: Vec<DecisionTree>,
    ) -> Result<Self, LoadError> {
        let forest = Self {
            classes,
            features,
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        validate_header(&self.classes, &self.features)?;

        if self.trees.is_empty() {
            return Err(LoadError::InvalidModel("forest has no trees".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, self.features.len(), self.classes.len())?;
        }

        Ok(())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn score_row(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        let mut acc = vec![0.0; self.classes.len()];
        for (i, tree) in self.trees.iter().enumerate() {
            let leaf = tree.leaf(row).ok_or(ModelError::MalformedTree(i))?;
            let total: f64 = leaf.iter().sum();
            for (a, v) in acc.iter_mut().zip(leaf) {
                *a += v / total;
            }
        }

        let n = self.trees.len() as f64;
        Ok(acc.into_iter().map(|a| a / n).collect())
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict_proba(&self, frame: &FeatureFrame) -> Result<Vec<Vec<f64>>, ModelError> {
        frame
            .to_matrix(&self.features)?
            .iter()
            .map(|row| self.score_row(row))
            .collect()
    }
}
