//! Disposition classifier network
//!
//! Architecture: Input(13) → Hidden(64) → ReLU → Dropout
//!                         → Hidden(32) → ReLU → Dropout
//!                         → logits(n_classes)

use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::tensor::activation::{relu, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// Configuration for the classifier network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpConfig {
    /// Input dimension (derived feature vector)
    pub input_dim: usize,
    /// Hidden layer dimensions, applied in order
    pub hidden_dims: Vec<usize>,
    /// Number of disposition classes
    pub n_classes: usize,
    /// Dropout rate (inactive outside training)
    pub dropout: f64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        MlpConfig {
            input_dim: FeatureVector::DIM,
            hidden_dims: vec![64, 32],
            n_classes: 3,
            dropout: 0.1,
        }
    }
}

/// A single hidden layer block: Linear → ReLU → Dropout
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize, dropout: f64) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = relu(x);
        self.dropout.forward(x)
    }
}

/// Multi-layer perceptron producing one logit per class
#[derive(Module, Debug)]
pub struct ExoplanetMlp<B: Backend> {
    hidden: Vec<HiddenBlock<B>>,
    output: Linear<B>,
}

impl<B: Backend> ExoplanetMlp<B> {
    pub fn new(device: &B::Device, config: &MlpConfig) -> Self {
        let mut hidden = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.input_dim;
        for &out_dim in &config.hidden_dims {
            hidden.push(HiddenBlock::new(device, in_dim, out_dim, config.dropout));
            in_dim = out_dim;
        }

        ExoplanetMlp {
            hidden,
            output: LinearConfig::new(in_dim, config.n_classes).init(device),
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `features` - Standardised features [batch, input_dim]
    ///
    /// # Returns
    /// Class logits [batch, n_classes]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self
            .hidden
            .iter()
            .fold(features, |x, block| block.forward(x));
        self.output.forward(x)
    }

    /// Class probabilities [batch, n_classes]
    pub fn probabilities(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.forward(features), 1)
    }
}
