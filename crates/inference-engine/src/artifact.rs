//! Model Artifact Formats
//!
//! A fitted ensemble on disk is either JSON (`.json`) or postcard
//! (`.bin`, `.postcard`). Both encode the same [`ArtifactFile`] structure:
//!
//! ```json
//! {"random_forest": {
//!     "feature_names": ["Type_L", "Type_M", "..."],
//!     "n_features": 8,
//!     "classes": [0, 1],
//!     "trees": [{"nodes": [
//!         {"split": {"feature": 6, "threshold": 60.0, "left": 1, "right": 2}},
//!         {"leaf": {"value": [9.0, 1.0]}},
//!         {"leaf": {"value": [2.0, 8.0]}}
//!     ]}]
//! }}
//! ```

use crate::classifier::Classifier;
use crate::forest::{MultiOutputForest, RandomForest};
use crate::{ArtifactError, InferenceError};
use feature_reconciler::Schema;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Top-level artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFile {
    /// Binary or multiclass forest
    RandomForest(ForestArtifact),
    /// One binary forest per failure mode
    MultiOutputForest(MultiOutputArtifact),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    /// Column names seen at fit time, if the trainer recorded them
    pub feature_names: Option<Vec<String>>,
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub trees: Vec<TreeArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiOutputArtifact {
    pub feature_names: Option<Vec<String>>,
    pub n_features: usize,
    pub outputs: Vec<OutputArtifact>,
}

/// Forest for a single failure mode label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub label: String,
    pub trees: Vec<TreeArtifact>,
}

/// Flattened tree, root at index 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArtifact {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// `row[feature] <= threshold` continues at `left`, otherwise `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class weights
    Leaf { value: Vec<f64> },
}

/// Encoding of an artifact file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Postcard,
}

impl ArtifactFormat {
    /// Pick the format from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(ArtifactFormat::Json),
            "bin" | "postcard" => Some(ArtifactFormat::Postcard),
            _ => None,
        }
    }
}

impl ArtifactFile {
    pub fn decode(bytes: &[u8], format: ArtifactFormat) -> Result<Self, ArtifactError> {
        match format {
            ArtifactFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| ArtifactError::Decode(e.to_string()))
            }
            ArtifactFormat::Postcard => {
                postcard::from_bytes(bytes).map_err(|e| ArtifactError::Decode(e.to_string()))
            }
        }
    }

    pub fn encode(&self, format: ArtifactFormat) -> Result<Vec<u8>, ArtifactError> {
        match format {
            ArtifactFormat::Json => {
                serde_json::to_vec_pretty(self).map_err(|e| ArtifactError::Encode(e.to_string()))
            }
            ArtifactFormat::Postcard => {
                postcard::to_allocvec(self).map_err(|e| ArtifactError::Encode(e.to_string()))
            }
        }
    }

    /// Validate the artifact and build the runtime model
    pub fn into_classifier(self) -> Result<Arc<dyn Classifier>, ArtifactError> {
        match self {
            ArtifactFile::RandomForest(forest) => {
                let schema = resolve_schema(forest.feature_names.clone(), forest.n_features)?;
                let model = RandomForest::from_artifact(forest, schema)?;
                debug!(
                    "Built random forest: {} trees, {} nodes",
                    model.tree_count(),
                    model.node_count()
                );
                Ok(Arc::new(model))
            }
            ArtifactFile::MultiOutputForest(forest) => {
                let schema = resolve_schema(forest.feature_names.clone(), forest.n_features)?;
                let model = MultiOutputForest::from_artifact(forest, schema)?;
                debug!(
                    "Built multi-output forest: {} trees, {} nodes",
                    model.tree_count(),
                    model.node_count()
                );
                Ok(Arc::new(model))
            }
        }
    }
}

/// Declared feature names, or the dashboard layout when the artifact has none
fn resolve_schema(
    feature_names: Option<Vec<String>>,
    n_features: usize,
) -> Result<Schema, ArtifactError> {
    match feature_names {
        Some(names) => {
            if names.len() != n_features {
                return Err(ArtifactError::FeatureCount {
                    names: names.len(),
                    n_features,
                });
            }
            Ok(Schema::new(names)?)
        }
        None => {
            let canonical = Schema::canonical();
            if canonical.len() != n_features {
                return Err(ArtifactError::UnknownColumns(n_features));
            }
            debug!("Artifact has no feature names, using dashboard column layout");
            Ok(canonical)
        }
    }
}

/// Load and validate a model artifact from disk
pub fn load_model(path: impl AsRef<Path>) -> Result<Arc<dyn Classifier>, InferenceError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let format = ArtifactFormat::from_path(path)
        .ok_or_else(|| InferenceError::unavailable(&display, ArtifactError::UnsupportedFormat))?;

    let bytes = std::fs::read(path).map_err(|e| {
        let reason = match e.kind() {
            ErrorKind::NotFound => ArtifactError::NotFound,
            _ => ArtifactError::Read(e.to_string()),
        };
        InferenceError::unavailable(&display, reason)
    })?;

    let model = ArtifactFile::decode(&bytes, format)
        .and_then(ArtifactFile::into_classifier)
        .map_err(|reason| InferenceError::unavailable(&display, reason))?;

    info!(
        "Loaded model from {} ({} features, classes {:?})",
        path.display(),
        model.schema().len(),
        model.classes()
    );
    Ok(model)
}
