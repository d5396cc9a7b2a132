//! Validation Error Types

use feature_reconciler::SensorField;
use serde::Serialize;
use thiserror::Error;

/// Errors during input validation
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: SensorField,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Fractional value for a whole-number field
    #[error("{field} value {value} must be a whole number")]
    NotIntegral { field: SensorField, value: f64 },

    /// NaN or infinite value
    #[error("{field} value is not a finite number")]
    NotFinite { field: SensorField },

    /// Range definition is unusable
    #[error("Invalid range for {field}: {reason}")]
    InvalidRange { field: SensorField, reason: String },
}
