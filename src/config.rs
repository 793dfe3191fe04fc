//! Runtime configuration for diabetes-predict.
//!
//! Settings come from a JSON file with built-in defaults for anything it
//! omits; command-line flags override both.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::model::ClassLabel;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "diabetes-predict", about = "Diabetes prediction inference server")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides `server.listen`).
    #[arg(long)]
    pub listen: Option<String>,

    /// Path to the model artifact (overrides `model.path`).
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Model configuration.
    pub model: ModelConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address. Binds every interface by default.
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Model-related settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the model artifact, relative to the working directory.
    pub path: PathBuf,

    /// Class label whose probability is reported.
    pub positive_class: ClassLabel,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./diabetes.json"),
            positive_class: 1,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply command-line overrides on top of the loaded file.
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if let Some(listen) = &cli.listen {
            self.server.listen = listen.clone();
        }
        if let Some(model) = &cli.model {
            self.model.path = model.clone();
        }
        self
    }
}
