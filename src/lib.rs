//! Exoplanet disposition prediction
//!
//! Derives physics-informed features from a sparse record of raw measurements
//! and runs them through a trained classifier to obtain a disposition label
//! (CONFIRMED, CANDIDATE, FALSE POSITIVE).

pub mod features;
pub mod model;
pub mod predict;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// CPU backend used for inference by the command-line tool
pub type DefaultBackend = burn::backend::NdArray<f32>;

/// Application-wide errors
#[derive(Debug, Error)]
pub enum ExoplanetError {
    #[error("Artifact unavailable at {path}: {reason}")]
    ArtifactUnavailable { path: String, reason: String },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Classifier returned unknown class id {0}")]
    UnknownClass(usize),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExoplanetError {
    pub(crate) fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ExoplanetError::ArtifactUnavailable {
            path: path.into().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExoplanetError>;

/// Application configuration loaded from exoplanet.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Location of the trained classifier and label codec
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory holding both artifacts
    pub dir: String,
    /// Stem of the classifier files (`<stem>.mpk` weights, `<stem>.json` metadata)
    pub model_name: String,
    /// Label codec file name
    pub encoder_file: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        ArtifactConfig {
            dir: "models".to_string(),
            model_name: "exoplanet_model".to_string(),
            encoder_file: "label_encoder.json".to_string(),
        }
    }
}

impl ArtifactConfig {
    /// Classifier path without extension
    pub fn model_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.model_name)
    }

    pub fn encoder_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.encoder_file)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Attach the label -> probability map to every prediction
    pub include_probabilities: bool,
    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExoplanetError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| ExoplanetError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ExoplanetError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
