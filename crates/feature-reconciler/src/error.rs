//! Reconciliation Error Types

use thiserror::Error;

/// Errors produced while building a feature vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    /// Schema columns that no mapping rule or fill policy could populate
    #[error("Schema columns could not be populated: {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    /// Schema is empty or repeats a column
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Machine type outside {L, M, H}
    #[error("Unknown machine type `{0}`, expected one of L, M, H")]
    UnknownMachineType(String),

    /// Value count does not match the schema width
    #[error("Feature vector has {actual} values for {expected} columns")]
    LengthMismatch { expected: usize, actual: usize },

    /// NaN or infinite value in a column
    #[error("Column `{column}` holds a non-finite value")]
    NonFinite { column: String },
}
