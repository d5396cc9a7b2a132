//! Range Checking for Dashboard Readings

use crate::error::ValidationError;
use feature_reconciler::{RawInput, SensorField};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Closed interval a reading must fall in, plus its initial value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldRange {
    pub min: f64,
    pub max: f64,
    /// Initial value shown to the user
    pub default: f64,
    /// Only whole numbers are accepted
    #[serde(default)]
    pub integral: bool,
}

impl FieldRange {
    pub const fn new(min: f64, max: f64, default: f64) -> Self {
        Self {
            min,
            max,
            default,
            integral: false,
        }
    }

    pub fn integral(mut self) -> Self {
        self.integral = true;
        self
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Air temperature (K)
    pub air_temperature: FieldRange,
    /// Process temperature (K)
    pub process_temperature: FieldRange,
    /// Rotational speed (rpm)
    pub rotational_speed: FieldRange,
    /// Torque (Nm)
    pub torque: FieldRange,
    /// Tool wear (min)
    pub tool_wear: FieldRange,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            air_temperature: FieldRange::new(295.0, 320.0, 300.0),
            process_temperature: FieldRange::new(305.0, 340.0, 310.0),
            rotational_speed: FieldRange::new(1200.0, 3000.0, 1500.0).integral(),
            torque: FieldRange::new(3.0, 80.0, 40.0),
            tool_wear: FieldRange::new(0.0, 250.0, 100.0).integral(),
        }
    }
}

impl ValidationConfig {
    /// Range configured for a field
    pub fn range(&self, field: SensorField) -> FieldRange {
        match field {
            SensorField::AirTemperature => self.air_temperature,
            SensorField::ProcessTemperature => self.process_temperature,
            SensorField::RotationalSpeed => self.rotational_speed,
            SensorField::Torque => self.torque,
            SensorField::ToolWear => self.tool_wear,
        }
    }

    /// Input built from every field's default
    pub fn defaults(&self) -> RawInput {
        SensorField::ALL
            .into_iter()
            .fold(RawInput::default(), |input, field| {
                input.with_value(field, self.range(field).default)
            })
    }

    /// Reject inverted bounds or defaults outside their range
    pub fn check(&self) -> Result<(), ValidationError> {
        for field in SensorField::ALL {
            let range = self.range(field);
            if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
                return Err(ValidationError::InvalidRange {
                    field,
                    reason: format!("bounds [{}, {}] are not an interval", range.min, range.max),
                });
            }
            if !range.contains(range.default) {
                return Err(ValidationError::InvalidRange {
                    field,
                    reason: format!(
                        "default {} lies outside [{}, {}]",
                        range.default, range.min, range.max
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Result of validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// Whether all values are valid
    pub valid: bool,
    /// List of validation errors
    pub errors: Vec<ValidationError>,
    /// Number of fields validated
    pub fields_checked: usize,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid(fields_checked: usize) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            fields_checked,
        }
    }

    /// Create an invalid result with errors
    pub fn invalid(errors: Vec<ValidationError>, fields_checked: usize) -> Self {
        Self {
            valid: false,
            errors,
            fields_checked,
        }
    }
}

/// Slider description for one reading
#[derive(Debug, Clone, Serialize)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub column: &'static str,
    #[serde(flatten)]
    pub range: FieldRange,
}

/// Validator for dashboard readings
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a single reading
    pub fn validate_field(&self, field: SensorField, value: f64) -> Result<(), ValidationError> {
        let range = self.config.range(field);

        if !value.is_finite() {
            return Err(ValidationError::NotFinite { field });
        }
        if !range.contains(value) {
            return Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.min,
                max: range.max,
            });
        }
        if range.integral && value.fract() != 0.0 {
            return Err(ValidationError::NotIntegral { field, value });
        }
        Ok(())
    }

    /// Validate every reading, collecting all errors
    pub fn validate(&self, input: &RawInput) -> ValidationResult {
        let errors: Vec<ValidationError> = SensorField::ALL
            .into_iter()
            .filter_map(|field| self.validate_field(field, input.value(field)).err())
            .collect();

        if errors.is_empty() {
            ValidationResult::valid(SensorField::ALL.len())
        } else {
            debug!("Input rejected with {} errors", errors.len());
            ValidationResult::invalid(errors, SensorField::ALL.len())
        }
    }

    /// Slider metadata for every reading
    pub fn fields(&self) -> Vec<FieldDescriptor> {
        SensorField::ALL
            .into_iter()
            .map(|field| FieldDescriptor {
                key: field.key(),
                label: field.label(),
                column: field.column(),
                range: self.config.range(field),
            })
            .collect()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
