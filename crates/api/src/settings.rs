//! Dashboard Configuration
//!
//! Layered from built-in defaults, an optional config file and `PDM__*`
//! environment variables (for example `PDM__MODEL_PATH` or
//! `PDM__RISK__HIGH_RISK_THRESHOLD`).

use crate::error::DashboardError;
use alerting::RiskConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use feature_reconciler::FillPolicy;
use input_validator::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;

/// Config file looked up when `PDM_CONFIG` is unset (any supported extension)
pub const DEFAULT_CONFIG_FILE: &str = "pdm-dashboard";

/// What to do when the model declares columns the inputs cannot supply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Fill the columns and return a warning with the prediction
    #[default]
    Proceed,
    /// Refuse the prediction
    Abort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Listen address
    pub bind_addr: String,
    /// Model artifact (.json, .bin or .postcard)
    pub model_path: PathBuf,
    /// Value for model columns the inputs do not supply
    pub fill_value: f64,
    pub on_schema_mismatch: MismatchPolicy,
    pub log_format: LogFormat,
    /// Maximum log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub risk: RiskConfig,
    /// Accepted reading ranges
    pub inputs: ValidationConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            model_path: PathBuf::from("trained_rf_model.json"),
            fill_value: 0.0,
            on_schema_mismatch: MismatchPolicy::Proceed,
            log_format: LogFormat::Pretty,
            log_level: "info".to_string(),
            risk: RiskConfig::default(),
            inputs: ValidationConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Load from `$PDM_CONFIG` (or `pdm-dashboard.*`) and the environment
    pub fn load() -> Result<Self, DashboardError> {
        let path =
            std::env::var("PDM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from a config file, which may be absent
    pub fn load_from(path: &str) -> Result<Self, DashboardError> {
        Self::from_builder(Config::builder().add_source(File::with_name(path).required(false)))
    }

    /// Finish a builder: apply environment overrides, deserialize, check
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, DashboardError> {
        let config: Self = builder
            .add_source(
                Environment::with_prefix("PDM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    /// Reject values that would make every prediction fail
    pub fn check(&self) -> Result<(), DashboardError> {
        if !self.fill_value.is_finite() {
            return Err(DashboardError::Config(format!(
                "fill_value {} is not a finite number",
                self.fill_value
            )));
        }
        self.max_level()?;
        self.inputs
            .check()
            .map_err(|e| DashboardError::Config(e.to_string()))
    }

    /// Parsed `log_level`
    pub fn max_level(&self) -> Result<Level, DashboardError> {
        self.log_level.parse::<Level>().map_err(|_| {
            DashboardError::Config(format!(
                "log_level `{}` is not one of trace, debug, info, warn, error",
                self.log_level
            ))
        })
    }

    /// Reconciler fill policy implied by the mismatch policy and fill value
    pub fn fill_policy(&self) -> FillPolicy {
        match self.on_schema_mismatch {
            MismatchPolicy::Abort => FillPolicy::Reject,
            MismatchPolicy::Proceed if self.fill_value == 0.0 => FillPolicy::Zero,
            MismatchPolicy::Proceed => FillPolicy::Constant(self.fill_value),
        }
    }
}
