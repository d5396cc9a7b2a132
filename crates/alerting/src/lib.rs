//! Risk Alerting
//!
//! Turns a model prediction into the risk label and message shown to the operator.

mod risk;

pub use risk::{AlertingError, RiskAssessment, RiskAssessor, RiskConfig, RiskLevel};
