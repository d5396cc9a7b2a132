//! Failure Prediction Engine
//!
//! Loads a fitted tree-ensemble artifact once and runs predictions on
//! reconciled feature vectors.

mod artifact;
mod classifier;
mod engine;
mod forest;

pub use artifact::{
    load_model, ArtifactFile, ArtifactFormat, ForestArtifact, MultiOutputArtifact, Node,
    OutputArtifact, TreeArtifact,
};
pub use classifier::{Classifier, FailureMode, FailureModeFlag, NO_FAILURE_CLASS};
pub use engine::{InferenceEngine, InferenceResult, Prediction};
pub use forest::{DecisionTree, MultiOutputForest, RandomForest};

use feature_reconciler::ReconcileError;
use thiserror::Error;

/// Errors during model loading or inference
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("Model unavailable at {path}: {reason}")]
    ModelUnavailable {
        path: String,
        #[source]
        reason: ArtifactError,
    },
    #[error("Prediction failed: {0}")]
    PredictionFailure(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
}

impl InferenceError {
    pub(crate) fn unavailable(path: impl Into<String>, reason: ArtifactError) -> Self {
        InferenceError::ModelUnavailable {
            path: path.into(),
            reason,
        }
    }
}

/// Reasons an artifact cannot become a runtime model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArtifactError {
    #[error("unsupported extension, expected .json, .bin or .postcard")]
    UnsupportedFormat,
    #[error("file not found")]
    NotFound,
    #[error("read failed: {0}")]
    Read(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("{names} feature names declared for {n_features} features")]
    FeatureCount { names: usize, n_features: usize },
    #[error("artifact declares no feature names and {0} features; cannot infer columns")]
    UnknownColumns(usize),
    #[error("invalid feature names: {0}")]
    Schema(#[from] ReconcileError),

    #[error("ensemble has no trees")]
    NoTrees,
    #[error("tree has no nodes")]
    EmptyTree,
    #[error("node {node} splits on feature {feature} of {n_features}")]
    FeatureOutOfRange {
        node: usize,
        feature: usize,
        n_features: usize,
    },
    #[error("node {0} has a NaN threshold")]
    NanThreshold(usize),
    #[error("node {node} has invalid child {child}")]
    InvalidChild { node: usize, child: usize },
    #[error("leaf {node} has {len} values for {n_classes} classes")]
    LeafWidth {
        node: usize,
        len: usize,
        n_classes: usize,
    },
    #[error("leaf {0} has negative or non-finite weights")]
    InvalidWeights(usize),
    #[error("leaf {0} has no weight")]
    EmptyLeaf(usize),
    #[error("tree {index}: {error}")]
    Tree {
        index: usize,
        error: Box<ArtifactError>,
    },

    #[error("expected at least 2 classes, found {0}")]
    TooFewClasses(usize),
    #[error("class labels repeat")]
    DuplicateClasses,
    #[error("class labels lack the no-failure class {}", NO_FAILURE_CLASS)]
    MissingNoFailureClass,

    #[error("unknown failure mode `{0}`")]
    UnknownMode(String),
    #[error("failure mode {0} appears twice")]
    DuplicateMode(FailureMode),
    #[error("missing failure modes: {}", join_modes(.0))]
    MissingModes(Vec<FailureMode>),
    #[error("{mode}: {error}")]
    Output {
        mode: FailureMode,
        error: Box<ArtifactError>,
    },
}

fn join_modes(modes: &[FailureMode]) -> String {
    modes.iter().map(FailureMode::code).collect::<Vec<_>>().join(", ")
}
