//! Feature derivation
//!
//! Converts a sparse raw measurement record into the model-ready vector.

pub mod derived;
pub mod record;

pub use derived::{derive, FeatureVector, DENOMINATOR_EPSILON, FEATURE_COLUMNS, RAW_COLUMNS};
pub use record::RawRecord;
