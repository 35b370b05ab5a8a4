//! Raw measurement record as supplied on the command line

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{ExoplanetError, Result};

/// Sparse mapping from measurement name to value
///
/// Built once per invocation and only read afterwards. Keys outside the
/// known column set are kept here and dropped during derivation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    values: BTreeMap<String, f64>,
}

impl RawRecord {
    /// Parse a JSON object such as `{"orb_period": 10, "st_teff": 5700}`
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ExoplanetError::MalformedInput(e.to_string()))?;
        Self::from_json_value(value)
    }

    /// Build from an already parsed JSON value, which must be an object
    ///
    /// Non-numeric entries (null, strings, booleans, nested values) count as
    /// absent, so they fall through to the derivation defaults.
    pub fn from_json_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(ExoplanetError::MalformedInput(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        };

        let mut values = BTreeMap::new();
        for (key, value) in map {
            match value.as_f64() {
                Some(v) => {
                    values.insert(key, v);
                }
                None => log::debug!("Ignoring non-numeric value for '{}': {}", key, value),
            }
        }

        Ok(RawRecord { values })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Value for `name`, or `default` when the key is absent
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        RawRecord {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
