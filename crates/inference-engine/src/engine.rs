//! Inference Engine Implementation

use crate::artifact::load_model;
use crate::classifier::{Classifier, FailureModeFlag, NO_FAILURE_CLASS};
use crate::InferenceError;
use feature_reconciler::{FeatureVector, Schema};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tolerance when checking that probabilities sum to one
const PROBABILITY_EPSILON: f64 = 1e-6;

/// Prediction result from inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class label
    pub label: i64,
    /// Whether the label is anything other than "no failure"
    pub failed: bool,
    /// Probability of any failure (0.0 to 1.0)
    pub failure_probability: f64,
    /// Class labels, aligned with `class_probabilities`
    pub classes: Vec<i64>,
    /// Probabilities for each class
    pub class_probabilities: Vec<f64>,
    /// Per-mode flags for multi-output models
    pub failure_modes: Option<Vec<FailureModeFlag>>,
    /// Timestamp when prediction was made
    pub timestamp_ms: u64,
}

/// Result of inference operation
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// The prediction
    pub prediction: Prediction,
    /// Inference latency in microseconds
    pub latency_us: u64,
}

/// Loaded model shared read-only for the life of the process
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    model: Arc<dyn Classifier>,
    source: String,
}

impl InferenceEngine {
    /// Load a model artifact from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        info!("Creating inference engine with model: {}", path.display());
        let model = load_model(path)?;
        Ok(Self {
            model,
            source: path.display().to_string(),
        })
    }

    /// Wrap an already constructed classifier
    pub fn from_classifier(model: Arc<dyn Classifier>, source: impl Into<String>) -> Self {
        Self {
            model,
            source: source.into(),
        }
    }

    /// Columns the model expects, in order
    pub fn schema(&self) -> &Schema {
        self.model.schema()
    }

    pub fn classes(&self) -> &[i64] {
        self.model.classes()
    }

    /// Where the model came from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run the model on one reconciled row
    pub fn predict(&self, features: &FeatureVector) -> Result<InferenceResult, InferenceError> {
        let start = std::time::Instant::now();

        if features.schema() != self.model.schema() {
            return Err(InferenceError::InvalidInputShape {
                expected: self.model.schema().columns().join(", "),
                actual: features.schema().columns().join(", "),
            });
        }

        let row = features.values();
        if let Some((column, _)) = features.iter().find(|(_, v)| !v.is_finite()) {
            return Err(InferenceError::PredictionFailure(format!(
                "column `{}` is not a finite number",
                column
            )));
        }

        let model = &self.model;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let proba = model.predict_proba(row)?;
            let label = model.predict(row)?;
            let modes = model.failure_modes(row)?;
            Ok::<_, InferenceError>((proba, label, modes))
        }));

        let (proba, label, failure_modes) = match outcome {
            Ok(result) => result?,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("Model panicked during prediction: {}", message);
                return Err(InferenceError::PredictionFailure(format!(
                    "model panicked: {}",
                    message
                )));
            }
        };

        let classes = self.model.classes().to_vec();
        check_probabilities(&proba, classes.len())?;

        let failure_probability = classes
            .iter()
            .position(|&c| c == NO_FAILURE_CLASS)
            .map(|i| 1.0 - proba[i])
            .unwrap_or(1.0)
            .clamp(0.0, 1.0);

        let timestamp_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let latency_us = start.elapsed().as_micros() as u64;
        debug!(
            "Inference completed in {}us: label={}, p_fail={:.4}",
            latency_us, label, failure_probability
        );

        Ok(InferenceResult {
            prediction: Prediction {
                label,
                failed: label != NO_FAILURE_CLASS,
                failure_probability,
                classes,
                class_probabilities: proba,
                failure_modes,
                timestamp_ms,
            },
            latency_us,
        })
    }
}

fn check_probabilities(proba: &[f64], n_classes: usize) -> Result<(), InferenceError> {
    if proba.len() != n_classes {
        return Err(InferenceError::PredictionFailure(format!(
            "model returned {} probabilities for {} classes",
            proba.len(),
            n_classes
        )));
    }
    if proba.iter().any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0) {
        return Err(InferenceError::PredictionFailure(
            "model returned probabilities outside [0, 1]".to_string(),
        ));
    }
    let total: f64 = proba.iter().sum();
    if (total - 1.0).abs() > PROBABILITY_EPSILON {
        return Err(InferenceError::PredictionFailure(format!(
            "model probabilities sum to {}",
            total
        )));
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ForestArtifact, MultiOutputArtifact, OutputArtifact};
    use crate::forest::tests::stump;
    use crate::forest::{MultiOutputForest, RandomForest};
    use feature_reconciler::{reconcile, MachineType, RawInput};

    fn forest_engine() -> InferenceEngine {
        let artifact = ForestArtifact {
            feature_names: None,
            n_features: 8,
            classes: vec![0, 1],
            trees: vec![stump(6, 60.0, [9.0, 1.0], [2.0, 8.0])],
        };
        let model = RandomForest::from_artifact(artifact, Schema::canonical()).unwrap();
        InferenceEngine::from_classifier(Arc::new(model), "memory")
    }

    #[test]
    fn test_low_risk_prediction() {
        let engine = forest_engine();
        let features = reconcile(&RawInput::default(), engine.schema()).unwrap();

        let result = engine.predict(&features).unwrap();
        assert_eq!(result.prediction.label, 0);
        assert!(!result.prediction.failed);
        assert!((result.prediction.failure_probability - 0.1).abs() < 1e-12);
        assert!(result.prediction.failure_modes.is_none());
    }

    #[test]
    fn test_high_torque_predicts_failure() {
        let engine = forest_engine();
        let input = RawInput {
            torque_nm: 75.0,
            machine_type: MachineType::Low,
            ..Default::default()
        };
        let features = reconcile(&input, engine.schema()).unwrap();

        let result = engine.predict(&features).unwrap();
        assert!(result.prediction.failed);
        assert!((result.prediction.failure_probability - 0.8).abs() < 1e-12);
        assert_eq!(result.prediction.classes, vec![0, 1]);
    }

    #[test]
    fn test_schema_mismatch_is_shape_error() {
        let engine = forest_engine();
        let other = Schema::new(["Torque [Nm]", "Type_L"]).unwrap();
        let features = reconcile(&RawInput::default(), &other).unwrap();

        let err = engine.predict(&features).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidInputShape { .. }));
    }

    #[test]
    fn test_multi_output_reports_modes() {
        let outputs = ["TWF", "HDF", "PWF", "OSF", "RNF"]
            .iter()
            .map(|label| OutputArtifact {
                label: label.to_string(),
                trees: vec![stump(7, 200.0, [1.0, 0.0], [1.0, 1.0])],
            })
            .collect();
        let artifact = MultiOutputArtifact {
            feature_names: None,
            n_features: 8,
            outputs,
        };
        let model = MultiOutputForest::from_artifact(artifact, Schema::canonical()).unwrap();
        let engine = InferenceEngine::from_classifier(Arc::new(model), "memory");

        let input = RawInput {
            tool_wear_min: 240.0,
            ..Default::default()
        };
        let features = reconcile(&input, engine.schema()).unwrap();
        let prediction = engine.predict(&features).unwrap().prediction;

        let modes = prediction.failure_modes.unwrap();
        assert_eq!(modes.len(), 5);
        assert!(modes.iter().all(|m| m.flagged && m.probability == 0.5));
        assert!(prediction.failed);
        assert_eq!(prediction.failure_probability, 0.5);
    }

    #[derive(Debug)]
    struct Panicking(Schema);

    impl Classifier for Panicking {
        fn schema(&self) -> &Schema {
            &self.0
        }

        fn classes(&self) -> &[i64] {
            &[0, 1]
        }

        fn predict_proba(&self, _row: &[f64]) -> Result<Vec<f64>, InferenceError> {
            panic!("dtype mismatch")
        }
    }

    #[test]
    fn test_panicking_model_is_contained() {
        let engine =
            InferenceEngine::from_classifier(Arc::new(Panicking(Schema::canonical())), "memory");
        let features = reconcile(&RawInput::default(), engine.schema()).unwrap();

        let err = engine.predict(&features).unwrap_err();
        match err {
            InferenceError::PredictionFailure(msg) => {
                assert_eq!(msg, "model panicked: dtype mismatch")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[derive(Debug)]
    struct Unnormalized(Schema);

    impl Classifier for Unnormalized {
        fn schema(&self) -> &Schema {
            &self.0
        }

        fn classes(&self) -> &[i64] {
            &[0, 1]
        }

        fn predict_proba(&self, _row: &[f64]) -> Result<Vec<f64>, InferenceError> {
            Ok(vec![0.9, 0.9])
        }
    }

    #[test]
    fn test_invalid_probabilities_rejected() {
        let engine =
            InferenceEngine::from_classifier(Arc::new(Unnormalized(Schema::canonical())), "memory");
        let features = reconcile(&RawInput::default(), engine.schema()).unwrap();
        assert!(matches!(
            engine.predict(&features),
            Err(InferenceError::PredictionFailure(_))
        ));
    }

    #[test]
    fn test_load_missing_artifact() {
        let err = InferenceEngine::load("/nonexistent/trained_rf_model.json").unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable { .. }));
    }
}
