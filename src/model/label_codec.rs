//! Class id <-> disposition label mapping

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ExoplanetError, Result};

/// Label codec artifact, stored as `{"classes": ["CANDIDATE", ...]}`
///
/// Class id `i` decodes to `classes[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCodec {
    classes: Vec<String>,
}

impl LabelCodec {
    pub fn new<S: Into<String>>(classes: impl IntoIterator<Item = S>) -> Self {
        LabelCodec {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json =
            std::fs::read_to_string(path).map_err(|e| ExoplanetError::artifact(path, e))?;
        let codec: LabelCodec =
            serde_json::from_str(&json).map_err(|e| ExoplanetError::artifact(path, e))?;

        if codec.classes.is_empty() {
            return Err(ExoplanetError::artifact(path, "label codec has no classes"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = codec.classes.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ExoplanetError::artifact(
                path,
                format!("duplicate label '{}'", dup),
            ));
        }

        log::info!("Loaded label codec from {} ({:?})", path.display(), codec.classes);
        Ok(codec)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            ExoplanetError::Io(std::io::Error::other(format!(
                "Failed to serialize label codec: {}",
                e
            )))
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Label for a class id
    pub fn decode(&self, class_id: usize) -> Result<&str> {
        self.classes
            .get(class_id)
            .map(String::as_str)
            .ok_or(ExoplanetError::UnknownClass(class_id))
    }

    /// Class id for a label
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
