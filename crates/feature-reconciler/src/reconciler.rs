//! Schema Reconciliation

use crate::error::ReconcileError;
use crate::input::{MachineType, RawInput, SensorField};
use crate::schema::Schema;
use crate::vector::FeatureVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What to do with schema columns no mapping rule produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Fill with 0
    #[default]
    Zero,
    /// Fill with a fixed value
    Constant(f64),
    /// Refuse with `SchemaMismatch`
    Reject,
}

impl FillPolicy {
    /// Value used for unmapped columns, `None` when filling is refused
    pub fn fill_value(&self) -> Option<f64> {
        match self {
            FillPolicy::Zero => Some(0.0),
            FillPolicy::Constant(value) => Some(*value),
            FillPolicy::Reject => None,
        }
    }
}

/// Columns that did not line up between the mapping rules and the schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Schema columns populated by the fill policy
    pub defaulted: Vec<String>,
    /// Mapped columns the schema does not declare
    pub unused: Vec<String>,
}

impl ReconcileReport {
    /// Every schema column came from a mapping rule
    pub fn is_exact(&self) -> bool {
        self.defaulted.is_empty()
    }
}

/// Reconciled vector plus the report describing how it was built
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub vector: FeatureVector,
    pub report: ReconcileReport,
}

/// Maps raw readings onto a model schema
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    fill: FillPolicy,
}

impl Reconciler {
    pub fn new(fill: FillPolicy) -> Self {
        Self { fill }
    }

    pub fn fill_policy(&self) -> FillPolicy {
        self.fill
    }

    /// Every column the mapping rules can produce from one input
    pub fn produce(input: &RawInput) -> Vec<(&'static str, f64)> {
        let mut produced = Vec::with_capacity(SensorField::ALL.len() + MachineType::ALL.len());

        for field in SensorField::ALL {
            produced.push((field.column(), input.value(field)));
        }

        for machine_type in MachineType::ALL {
            let indicator = if machine_type == input.machine_type { 1.0 } else { 0.0 };
            produced.push((machine_type.indicator_column(), indicator));
        }

        produced
    }

    /// Build the vector for `schema`, reporting filled and dropped columns
    pub fn reconcile(
        &self,
        input: &RawInput,
        schema: &Schema,
    ) -> Result<Reconciliation, ReconcileError> {
        let produced = Self::produce(input);

        let mapped: Vec<Option<f64>> = schema
            .columns()
            .iter()
            .map(|column| {
                produced
                    .iter()
                    .find(|(name, _)| *name == column.as_str())
                    .map(|&(_, value)| value)
            })
            .collect();

        let defaulted: Vec<String> = schema
            .columns()
            .iter()
            .zip(&mapped)
            .filter(|(_, value)| value.is_none())
            .map(|(column, _)| column.clone())
            .collect();

        let fill = match self.fill.fill_value() {
            Some(value) => value,
            None if defaulted.is_empty() => 0.0,
            None => {
                debug!("Rejecting schema, unmapped columns: {:?}", defaulted);
                return Err(ReconcileError::SchemaMismatch { missing: defaulted });
            }
        };

        let values = mapped.into_iter().map(|v| v.unwrap_or(fill)).collect();

        let unused: Vec<String> = produced
            .iter()
            .filter(|(name, _)| !schema.contains(name))
            .map(|(name, _)| name.to_string())
            .collect();

        debug!(
            "Reconciled {} columns ({} defaulted, {} unused)",
            schema.len(),
            defaulted.len(),
            unused.len()
        );

        Ok(Reconciliation {
            vector: FeatureVector::new_unchecked(schema.clone(), values),
            report: ReconcileReport { defaulted, unused },
        })
    }
}

/// Reconcile with zero fill, discarding the report
pub fn reconcile(input: &RawInput, schema: &Schema) -> Result<FeatureVector, ReconcileError> {
    Reconciler::default()
        .reconcile(input, schema)
        .map(|r| r.vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input_m() -> RawInput {
        RawInput {
            machine_type: MachineType::Medium,
            air_temperature_k: 300.0,
            process_temperature_k: 310.0,
            rotational_speed_rpm: 1500.0,
            torque_nm: 40.0,
            tool_wear_min: 100.0,
        }
    }

    #[test]
    fn test_canonical_schema() {
        let vector = reconcile(&input_m(), &Schema::canonical()).unwrap();
        assert_eq!(
            vector.values(),
            [0.0, 1.0, 0.0, 300.0, 310.0, 1500.0, 40.0, 100.0]
        );
        assert_eq!(vector.get("Type_M"), Some(1.0));
    }

    #[test]
    fn test_unmapped_column_zero_filled() {
        let schema = Schema::new(["Torque [Nm]", "RNF", "Type_L"]).unwrap();
        let result = Reconciler::default().reconcile(&input_m(), &schema).unwrap();

        assert_eq!(result.vector.values(), [40.0, 0.0, 0.0]);
        assert_eq!(result.report.defaulted, vec!["RNF".to_string()]);
        assert!(!result.report.is_exact());
    }

    #[test]
    fn test_constant_fill() {
        let schema = Schema::new(["RNF", "Tool wear [min]"]).unwrap();
        let result = Reconciler::new(FillPolicy::Constant(-1.0))
            .reconcile(&input_m(), &schema)
            .unwrap();
        assert_eq!(result.vector.values(), [-1.0, 100.0]);
    }

    #[test]
    fn test_reject_policy_reports_missing() {
        let schema = Schema::new(["TWF", "Torque [Nm]", "RNF"]).unwrap();
        let err = Reconciler::new(FillPolicy::Reject)
            .reconcile(&input_m(), &schema)
            .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::SchemaMismatch {
                missing: vec!["TWF".to_string(), "RNF".to_string()]
            }
        );
        assert_eq!(
            err.to_string(),
            "Schema columns could not be populated: TWF, RNF"
        );
    }

    #[test]
    fn test_reject_policy_accepts_exact_schema() {
        let result = Reconciler::new(FillPolicy::Reject)
            .reconcile(&input_m(), &Schema::canonical())
            .unwrap();
        assert!(result.report.is_exact());
    }

    #[test]
    fn test_schema_without_type_h_drops_it() {
        let schema = Schema::new([
            "Air temperature [K]",
            "Process temperature [K]",
            "Rotational speed [rpm]",
            "Torque [Nm]",
            "Tool wear [min]",
            "Type_L",
            "Type_M",
        ])
        .unwrap();
        let result = Reconciler::default()
            .reconcile(&input_m(), &schema)
            .unwrap();

        assert_eq!(result.vector.get("Type_H"), None);
        assert_eq!(result.vector.len(), 7);
        assert!(result.report.unused.contains(&"Type_H".to_string()));
    }

    #[test]
    fn test_engineered_columns_are_default_filled() {
        let schema =
            Schema::new(["Torque [Nm]", "Power [W]", "Temperature difference [K]"]).unwrap();
        let reconciler = Reconciler::default();

        let result = reconciler.reconcile(&input_m(), &schema).unwrap();
        assert_eq!(result.vector.values(), [40.0, 0.0, 0.0]);
        assert_eq!(
            result.report.defaulted,
            vec!["Power [W]".to_string(), "Temperature difference [K]".to_string()]
        );

        let heavier = RawInput {
            torque_nm: 60.0,
            ..input_m()
        };
        let result = reconciler.reconcile(&heavier, &schema).unwrap();
        assert_eq!(result.vector.get("Power [W]"), Some(0.0));

        let err = Reconciler::new(FillPolicy::Reject)
            .reconcile(&input_m(), &schema)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::SchemaMismatch { missing } if missing.len() == 2));
    }

    fn arb_machine_type() -> impl Strategy<Value = MachineType> {
        prop_oneof![
            Just(MachineType::Low),
            Just(MachineType::Medium),
            Just(MachineType::High),
        ]
    }

    fn arb_input() -> impl Strategy<Value = RawInput> {
        (
            arb_machine_type(),
            295.0..=320.0f64,
            305.0..=340.0f64,
            1200u32..=3000,
            3.0..=80.0f64,
            0u32..=250,
        )
            .prop_map(|(machine_type, air, process, speed, torque, wear)| RawInput {
                machine_type,
                air_temperature_k: air,
                process_temperature_k: process,
                rotational_speed_rpm: speed as f64,
                torque_nm: torque,
                tool_wear_min: wear as f64,
            })
    }

    fn arb_schema() -> impl Strategy<Value = Schema> {
        let pool: Vec<String> = [
            "Type_L",
            "Type_M",
            "Type_H",
            "Air temperature [K]",
            "Process temperature [K]",
            "Rotational speed [rpm]",
            "Torque [Nm]",
            "Tool wear [min]",
            "Power [W]",
            "TWF",
            "HDF",
            "RNF",
            "UDI",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        let max = pool.len();

        proptest::sample::subsequence(pool, 1..=max)
            .prop_shuffle()
            .prop_map(|cols| Schema::new(cols).unwrap())
    }

    proptest! {
        #[test]
        fn prop_output_matches_schema(input in arb_input(), schema in arb_schema()) {
            let vector = reconcile(&input, &schema).unwrap();
            let cols: Vec<&str> = vector.iter().map(|(c, _)| c).collect();
            let expected: Vec<&str> = schema.columns().iter().map(String::as_str).collect();
            prop_assert_eq!(cols, expected);
            prop_assert!(vector.values().iter().all(|v| v.is_finite()));
        }

        #[test]
        fn prop_exactly_one_indicator(input in arb_input()) {
            let vector = reconcile(&input, &Schema::canonical()).unwrap();
            let hot: Vec<&str> = MachineType::ALL
                .iter()
                .map(|t| t.indicator_column())
                .filter(|c| vector.get(c) == Some(1.0))
                .collect();
            prop_assert_eq!(hot, vec![input.machine_type.indicator_column()]);
            let cold = MachineType::ALL
                .iter()
                .filter(|t| vector.get(t.indicator_column()) == Some(0.0))
                .count();
            prop_assert_eq!(cold, 2);
        }

        #[test]
        fn prop_idempotent(input in arb_input(), schema in arb_schema()) {
            let reconciler = Reconciler::default();
            let first = reconciler.reconcile(&input, &schema).unwrap();
            let second = reconciler.reconcile(&input, &schema).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_defaulted_columns_ignore_input(
            a in arb_input(),
            b in arb_input(),
            schema in arb_schema(),
        ) {
            let reconciler = Reconciler::new(FillPolicy::Constant(7.0));
            let first = reconciler.reconcile(&a, &schema).unwrap();
            let second = reconciler.reconcile(&b, &schema).unwrap();
            prop_assert_eq!(&first.report.defaulted, &second.report.defaulted);
            for column in &first.report.defaulted {
                prop_assert_eq!(first.vector.get(column), Some(7.0));
                prop_assert_eq!(second.vector.get(column), Some(7.0));
            }
        }
    }
}
