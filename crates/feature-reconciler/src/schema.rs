//! Model Column Schema

use crate::error::ReconcileError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Column names used by the predictive maintenance dataset
pub mod columns {
    pub const AIR_TEMPERATURE: &str = "Air temperature [K]";
    pub const PROCESS_TEMPERATURE: &str = "Process temperature [K]";
    pub const ROTATIONAL_SPEED: &str = "Rotational speed [rpm]";
    pub const TORQUE: &str = "Torque [Nm]";
    pub const TOOL_WEAR: &str = "Tool wear [min]";

    pub const TYPE_L: &str = "Type_L";
    pub const TYPE_M: &str = "Type_M";
    pub const TYPE_H: &str = "Type_H";
}

/// Ordered, duplicate-free list of columns a fitted model expects.
///
/// Cloning is cheap; the column list is shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Schema {
    columns: Arc<[String]>,
}

impl Schema {
    /// Build a schema, rejecting empty or repeated column lists
    pub fn new<I, S>(columns: I) -> Result<Self, ReconcileError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(ReconcileError::InvalidSchema("schema has no columns".to_string()));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(ReconcileError::InvalidSchema(format!(
                    "duplicate column `{}`",
                    column
                )));
            }
        }

        Ok(Self {
            columns: columns.into(),
        })
    }

    /// Layout of the dashboard's hand-built input frame
    pub fn canonical() -> Self {
        let columns: Vec<String> = [
            columns::TYPE_L,
            columns::TYPE_M,
            columns::TYPE_H,
            columns::AIR_TEMPERATURE,
            columns::PROCESS_TEMPERATURE,
            columns::ROTATIONAL_SPEED,
            columns::TORQUE,
            columns::TOOL_WEAR,
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();

        Self {
            columns: columns.into(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of a column
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }
}

impl TryFrom<Vec<String>> for Schema {
    type Error = ReconcileError;

    fn try_from(columns: Vec<String>) -> Result<Self, Self::Error> {
        Schema::new(columns)
    }
}

impl From<Schema> for Vec<String> {
    fn from(schema: Schema) -> Self {
        schema.columns.to_vec()
    }
}
