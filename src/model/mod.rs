//! Trained artifacts
//!
//! - Classifier: burn MLP mapping the feature vector to class probabilities
//! - Label codec: class id to disposition label

pub mod classifier;
pub mod label_codec;
pub mod mlp;

pub use classifier::{Classifier, FeatureScaler, MlpClassifier, ModelMetadata};
pub use label_codec::LabelCodec;
pub use mlp::{ExoplanetMlp, MlpConfig};
