//! Trained classifier artifact
//!
//! The classifier is stored as two files sharing a stem:
//! `<stem>.mpk` holds the network weights, `<stem>.json` the metadata
//! (network shape, feature columns, standardisation parameters).

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use super::mlp::{ExoplanetMlp, MlpConfig};
use crate::features::{FeatureVector, FEATURE_COLUMNS};
use crate::{ExoplanetError, Result};

/// Anything that maps a feature vector to a class id
pub trait Classifier {
    /// Number of classes the classifier distinguishes
    fn n_classes(&self) -> usize;

    /// Probability distribution over class ids for a single vector
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f32>>;

    /// Most likely class id (first maximum on ties)
    ///
    /// Fails instead of picking a label when any probability is NaN or infinite.
    fn predict(&self, features: &FeatureVector) -> Result<usize> {
        let probs = check_finite(self.predict_proba(features)?)?;
        argmax(&probs).ok_or_else(|| ExoplanetError::Inference("empty probability vector".into()))
    }

    /// Training-time metadata, when the classifier carries any
    fn metadata(&self) -> Option<&ModelMetadata> {
        None
    }
}

/// Reject probability rows containing NaN or infinite values
pub fn check_finite(probs: Vec<f32>) -> Result<Vec<f32>> {
    if probs.iter().all(|p| p.is_finite()) {
        Ok(probs)
    } else {
        Err(ExoplanetError::Inference(format!(
            "non-finite class probabilities {:?}; check for negative or infinite inputs",
            probs
        )))
    }
}

pub(crate) fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Z-score standardisation fitted at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl FeatureScaler {
    /// Scaler that leaves values unchanged
    pub fn identity(dim: usize) -> Self {
        FeatureScaler {
            mean: vec![0.0; dim],
            std: vec![1.0; dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Apply (x - mean) / std; degenerate std values count as 1
    pub fn transform(&self, values: &[f32]) -> Vec<f32> {
        values
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(x, (m, s))| {
                let s = if s.is_finite() && *s > 0.0 { *s } else { 1.0 };
                (x - m) / s
            })
            .collect()
    }
}

/// Sidecar metadata written next to the weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Column order the network was trained on
    pub feature_columns: Vec<String>,
    pub config: MlpConfig,
    pub scaler: FeatureScaler,
}

impl ModelMetadata {
    pub fn new(config: MlpConfig, scaler: FeatureScaler) -> Self {
        ModelMetadata {
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            config,
            scaler,
        }
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.feature_columns != FEATURE_COLUMNS {
            return Err(ExoplanetError::artifact(
                path,
                format!(
                    "feature columns {:?} do not match the expected order",
                    self.feature_columns
                ),
            ));
        }
        if self.config.input_dim != FeatureVector::DIM {
            return Err(ExoplanetError::artifact(
                path,
                format!(
                    "input_dim is {}, expected {}",
                    self.config.input_dim,
                    FeatureVector::DIM
                ),
            ));
        }
        if self.config.n_classes == 0 {
            return Err(ExoplanetError::artifact(path, "classifier has no classes"));
        }
        if self.scaler.dim() != FeatureVector::DIM || self.scaler.std.len() != FeatureVector::DIM
        {
            return Err(ExoplanetError::artifact(
                path,
                "scaler dimension does not match feature vector",
            ));
        }
        Ok(())
    }
}

fn with_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut path = stem.as_os_str().to_owned();
    path.push(".");
    path.push(ext);
    PathBuf::from(path)
}

/// Weights file for a model stem
pub fn weights_path(stem: &Path) -> PathBuf {
    with_extension(stem, "mpk")
}

/// Metadata file for a model stem
pub fn metadata_path(stem: &Path) -> PathBuf {
    with_extension(stem, "json")
}

/// Neural disposition classifier backed by burn
pub struct MlpClassifier<B: Backend> {
    model: ExoplanetMlp<B>,
    metadata: ModelMetadata,
    device: B::Device,
}

impl<B: Backend> MlpClassifier<B> {
    pub fn new(model: ExoplanetMlp<B>, metadata: ModelMetadata, device: B::Device) -> Self {
        MlpClassifier {
            model,
            metadata,
            device,
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Save weights and metadata under `stem`
    pub fn save(&self, stem: &Path) -> Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.model
            .clone()
            .save_file(stem, &recorder)
            .map_err(|e| {
                ExoplanetError::Io(std::io::Error::other(format!("Failed to save model: {}", e)))
            })?;

        let json = serde_json::to_string_pretty(&self.metadata).map_err(|e| {
            ExoplanetError::Io(std::io::Error::other(format!(
                "Failed to serialize model metadata: {}",
                e
            )))
        })?;
        std::fs::write(metadata_path(stem), json)?;
        Ok(())
    }

    /// Load weights and metadata saved under `stem`
    pub fn load(stem: &Path, device: B::Device) -> Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let meta_path = metadata_path(stem);
        let weights = weights_path(stem);

        if !weights.exists() {
            return Err(ExoplanetError::artifact(&weights, "file not found"));
        }

        let json = std::fs::read_to_string(&meta_path)
            .map_err(|e| ExoplanetError::artifact(&meta_path, e))?;
        let metadata: ModelMetadata = serde_json::from_str(&json)
            .map_err(|e| ExoplanetError::artifact(&meta_path, e))?;
        metadata.validate(&meta_path)?;

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let model = ExoplanetMlp::new(&device, &metadata.config)
            .load_file(stem, &recorder, &device)
            .map_err(|e| ExoplanetError::artifact(&weights, e))?;

        log::info!(
            "Loaded classifier from {} ({} classes, hidden {:?})",
            weights.display(),
            metadata.config.n_classes,
            metadata.config.hidden_dims
        );

        Ok(Self::new(model, metadata, device))
    }

    fn features_to_tensor(&self, features: &FeatureVector) -> Tensor<B, 2> {
        let scaled = self.metadata.scaler.transform(&features.to_f32_vec());
        Tensor::<B, 1>::from_floats(scaled.as_slice(), &self.device)
            .reshape([1, FeatureVector::DIM])
    }
}

impl<B: Backend> Classifier for MlpClassifier<B> {
    fn n_classes(&self) -> usize {
        self.metadata.config.n_classes
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f32>> {
        let input = self.features_to_tensor(features);
        let probs = self.model.probabilities(input);

        let probs = probs
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| ExoplanetError::Inference(format!("{:?}", e)))?;
        check_finite(probs)
    }

    fn metadata(&self) -> Option<&ModelMetadata> {
        Some(&self.metadata)
    }
}
