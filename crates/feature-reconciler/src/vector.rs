//! Feature Vector

use crate::error::ReconcileError;
use crate::schema::Schema;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Single row of model input, laid out exactly as its schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: Schema,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Pair values with a schema. Values must match the schema width and be finite.
    pub fn from_values(schema: Schema, values: Vec<f64>) -> Result<Self, ReconcileError> {
        if values.len() != schema.len() {
            return Err(ReconcileError::LengthMismatch {
                expected: schema.len(),
                actual: values.len(),
            });
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ReconcileError::NonFinite {
                column: schema.columns()[pos].clone(),
            });
        }
        Ok(Self { schema, values })
    }

    pub(crate) fn new_unchecked(schema: Schema, values: Vec<f64>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Values in schema order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of a named column
    pub fn get(&self, column: &str) -> Option<f64> {
        self.schema.position(column).map(|i| self.values[i])
    }

    /// Column/value pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.schema
            .columns()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, &value)?;
        }
        map.end()
    }
}
