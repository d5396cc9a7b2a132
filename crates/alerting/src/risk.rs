//! Risk Assessment

use inference_engine::{FailureMode, Prediction};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlertingError {
    #[error("High risk threshold {0} must lie in [0, 1]")]
    InvalidThreshold(f64),
}

/// Risk labelling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Failure probability at or above which risk is high (default: 0.5)
    pub high_risk_threshold: f64,
    /// Let the model's predicted label decide instead of the threshold
    pub use_model_label: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_risk_threshold: 0.5,
            use_model_label: true,
        }
    }
}

/// Operator-facing risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    High,
}

/// What the dashboard shows for one prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Failure probability as a percentage (0 to 100)
    pub failure_probability_pct: f64,
    /// Progress gauge fill (0.0 to 1.0)
    pub gauge: f64,
    pub message: String,
    /// Failure modes the model flagged, if it predicts modes
    pub flagged_modes: Vec<FailureMode>,
}

/// Maps predictions to risk levels
#[derive(Debug, Clone)]
pub struct RiskAssessor {
    config: RiskConfig,
}

impl RiskAssessor {
    pub fn new(config: RiskConfig) -> Result<Self, AlertingError> {
        let threshold = config.high_risk_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AlertingError::InvalidThreshold(threshold));
        }
        info!("Creating risk assessor with config: {:?}", config);
        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Assess a prediction
    pub fn assess(&self, prediction: &Prediction) -> RiskAssessment {
        let probability = prediction.failure_probability.clamp(0.0, 1.0);
        let pct = probability * 100.0;

        let high = if self.config.use_model_label {
            prediction.failed
        } else {
            probability >= self.config.high_risk_threshold
        };

        let (level, message) = if high {
            (
                RiskLevel::High,
                format!(
                    "High Risk: Machine Failure Likely! (Failure Probability: {:.2}%)",
                    pct
                ),
            )
        } else {
            (
                RiskLevel::Low,
                format!(
                    "Low Risk: Machine Operating Normally. (Failure Probability: {:.2}%)",
                    pct
                ),
            )
        };

        let flagged_modes: Vec<FailureMode> = prediction
            .failure_modes
            .iter()
            .flatten()
            .filter(|flag| flag.flagged)
            .map(|flag| flag.mode)
            .collect();

        for mode in &flagged_modes {
            info!("Failure mode flagged: {} ({})", mode, mode.description());
        }
        debug!("Assessed risk {:?} at {:.2}%", level, pct);

        RiskAssessment {
            level,
            failure_probability_pct: pct,
            gauge: probability,
            message,
            flagged_modes,
        }
    }
}

impl Default for RiskAssessor {
    fn default() -> Self {
        Self {
            config: RiskConfig::default(),
        }
    }
}
