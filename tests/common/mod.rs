//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use diabetes_predict::config::{Config, ModelConfig};
use tempfile::NamedTempFile;

/// One stump on `feature_b`: above 100 the positive class gets 0.73.
pub const SCENARIO_FOREST: &str = r#"{
    "kind": "random_forest",
    "classes": [0, 1],
    "features": ["feature_a", "feature_b"],
    "trees": [
        {"nodes": [
            {"feature": 1, "threshold": 100.0, "left": 1, "right": 2},
            {"value": [0.9, 0.1]},
            {"value": [0.27, 0.73]}
        ]}
    ]
}"#;

/// A row the bundled model scores well above 0.5.
pub const HIGH_RISK: &str = r#"{
    "Pregnancies": 6, "Glucose": 148, "BloodPressure": 72, "SkinThickness": 35,
    "Insulin": 0, "BMI": 33.6, "DiabetesPedigreeFunction": 0.627, "Age": 50
}"#;

/// A row the bundled model scores well below 0.5.
pub const LOW_RISK: &str = r#"{
    "Pregnancies": 1, "Glucose": 85, "BloodPressure": 66, "SkinThickness": 29,
    "Insulin": 0, "BMI": 26.6, "DiabetesPedigreeFunction": 0.351, "Age": 31
}"#;

/// Path of the artifact shipped at the repository root.
pub fn bundled_model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("diabetes.json")
}

/// Write an artifact to a temp file that lives as long as the handle.
pub fn write_artifact(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

pub fn config_for(path: PathBuf) -> Config {
    Config {
        model: ModelConfig {
            path,
            ..Default::default()
        },
        ..Default::default()
    }
}
