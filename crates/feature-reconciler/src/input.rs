//! Raw Sensor Input

use crate::error::ReconcileError;
use crate::schema::columns;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Machine quality variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineType {
    /// Low quality variant
    #[serde(rename = "L", alias = "l")]
    Low,
    /// Medium quality variant
    #[default]
    #[serde(rename = "M", alias = "m")]
    Medium,
    /// High quality variant
    #[serde(rename = "H", alias = "h")]
    High,
}

impl MachineType {
    /// Every known machine type, in indicator column order
    pub const ALL: [MachineType; 3] = [MachineType::Low, MachineType::Medium, MachineType::High];

    /// Single letter code used by the dataset
    pub fn code(&self) -> &'static str {
        match self {
            MachineType::Low => "L",
            MachineType::Medium => "M",
            MachineType::High => "H",
        }
    }

    /// One-hot indicator column for this type
    pub fn indicator_column(&self) -> &'static str {
        match self {
            MachineType::Low => columns::TYPE_L,
            MachineType::Medium => columns::TYPE_M,
            MachineType::High => columns::TYPE_H,
        }
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for MachineType {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        MachineType::ALL
            .into_iter()
            .find(|t| t.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| ReconcileError::UnknownMachineType(code.to_string()))
    }
}

/// Continuous reading collected by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorField {
    AirTemperature,
    ProcessTemperature,
    RotationalSpeed,
    Torque,
    ToolWear,
}

impl SensorField {
    /// All continuous fields, in display order
    pub const ALL: [SensorField; 5] = [
        SensorField::AirTemperature,
        SensorField::ProcessTemperature,
        SensorField::RotationalSpeed,
        SensorField::Torque,
        SensorField::ToolWear,
    ];

    /// Model column this field maps onto
    pub fn column(&self) -> &'static str {
        match self {
            SensorField::AirTemperature => columns::AIR_TEMPERATURE,
            SensorField::ProcessTemperature => columns::PROCESS_TEMPERATURE,
            SensorField::RotationalSpeed => columns::ROTATIONAL_SPEED,
            SensorField::Torque => columns::TORQUE,
            SensorField::ToolWear => columns::TOOL_WEAR,
        }
    }

    /// Field name in request payloads
    pub fn key(&self) -> &'static str {
        match self {
            SensorField::AirTemperature => "air_temperature_k",
            SensorField::ProcessTemperature => "process_temperature_k",
            SensorField::RotationalSpeed => "rotational_speed_rpm",
            SensorField::Torque => "torque_nm",
            SensorField::ToolWear => "tool_wear_min",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            SensorField::AirTemperature => "Air Temperature (K)",
            SensorField::ProcessTemperature => "Process Temperature (K)",
            SensorField::RotationalSpeed => "Rotational Speed (rpm)",
            SensorField::Torque => "Torque (Nm)",
            SensorField::ToolWear => "Tool Wear (min)",
        }
    }
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One set of readings submitted from the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    /// Machine quality variant
    pub machine_type: MachineType,
    /// Ambient air temperature (K)
    pub air_temperature_k: f64,
    /// Process temperature (K)
    pub process_temperature_k: f64,
    /// Spindle speed (rpm)
    pub rotational_speed_rpm: f64,
    /// Torque (Nm)
    pub torque_nm: f64,
    /// Accumulated tool wear (min)
    pub tool_wear_min: f64,
}

impl RawInput {
    /// Value of a continuous field
    pub fn value(&self, field: SensorField) -> f64 {
        match field {
            SensorField::AirTemperature => self.air_temperature_k,
            SensorField::ProcessTemperature => self.process_temperature_k,
            SensorField::RotationalSpeed => self.rotational_speed_rpm,
            SensorField::Torque => self.torque_nm,
            SensorField::ToolWear => self.tool_wear_min,
        }
    }

    /// Copy with one continuous field replaced
    pub fn with_value(mut self, field: SensorField, value: f64) -> Self {
        match field {
            SensorField::AirTemperature => self.air_temperature_k = value,
            SensorField::ProcessTemperature => self.process_temperature_k = value,
            SensorField::RotationalSpeed => self.rotational_speed_rpm = value,
            SensorField::Torque => self.torque_nm = value,
            SensorField::ToolWear => self.tool_wear_min = value,
        }
        self
    }
}

impl Default for RawInput {
    /// Initial slider positions of the dashboard
    fn default() -> Self {
        Self {
            machine_type: MachineType::Medium,
            air_temperature_k: 300.0,
            process_temperature_k: 310.0,
            rotational_speed_rpm: 1500.0,
            torque_nm: 40.0,
            tool_wear_min: 100.0,
        }
    }
}
