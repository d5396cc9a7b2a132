//! Classifier Interface

use crate::InferenceError;
use feature_reconciler::Schema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Class label meaning "machine operating normally"
pub const NO_FAILURE_CLASS: i64 = 0;

/// A fitted model as seen by the engine.
///
/// Rows passed in are already laid out in `schema()` order.
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Columns the model was fitted on, in order
    fn schema(&self) -> &Schema;

    /// Class labels, aligned with `predict_proba` output
    fn classes(&self) -> &[i64];

    /// Probability of each class
    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError>;

    /// Most probable class label
    fn predict(&self, row: &[f64]) -> Result<i64, InferenceError> {
        let proba = self.predict_proba(row)?;
        proba
            .iter()
            .enumerate()
            .fold(None::<(usize, f64)>, |best, (i, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
            .and_then(|(i, _)| self.classes().get(i).copied())
            .ok_or_else(|| {
                InferenceError::PredictionFailure("model returned no probabilities".to_string())
            })
    }

    /// Per-mode flags, for models that predict individual failure modes
    fn failure_modes(&self, _row: &[f64]) -> Result<Option<Vec<FailureModeFlag>>, InferenceError> {
        Ok(None)
    }
}

/// Failure modes recorded in the maintenance dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureMode {
    #[serde(rename = "TWF")]
    ToolWear,
    #[serde(rename = "HDF")]
    HeatDissipation,
    #[serde(rename = "PWF")]
    Power,
    #[serde(rename = "OSF")]
    Overstrain,
    #[serde(rename = "RNF")]
    Random,
}

impl FailureMode {
    /// Modes in output order
    pub const ALL: [FailureMode; 5] = [
        FailureMode::ToolWear,
        FailureMode::HeatDissipation,
        FailureMode::Power,
        FailureMode::Overstrain,
        FailureMode::Random,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            FailureMode::ToolWear => "TWF",
            FailureMode::HeatDissipation => "HDF",
            FailureMode::Power => "PWF",
            FailureMode::Overstrain => "OSF",
            FailureMode::Random => "RNF",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FailureMode::ToolWear => "Tool wear failure",
            FailureMode::HeatDissipation => "Heat dissipation failure",
            FailureMode::Power => "Power failure",
            FailureMode::Overstrain => "Overstrain failure",
            FailureMode::Random => "Random failure",
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for FailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FailureMode::ALL
            .into_iter()
            .find(|m| m.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown failure mode `{}`", s))
    }
}

/// Independent binary prediction for one failure mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureModeFlag {
    pub mode: FailureMode,
    pub flagged: bool,
    pub probability: f64,
}
