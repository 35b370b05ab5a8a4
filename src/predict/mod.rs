//! Prediction and inference
//!
//! Load trained artifacts and turn raw records into disposition labels.

pub mod inference;

pub use inference::{
    infer, run_batch, run_once, Artifacts, Outcome, PredictionResult, Predictor,
};
