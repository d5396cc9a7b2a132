//! Feature Reconciliation
//!
//! Turns the handful of readings the dashboard collects into the exact
//! column set, order and encoding declared by a fitted model.

mod error;
mod input;
mod reconciler;
mod schema;
mod vector;

pub use error::ReconcileError;
pub use input::{MachineType, RawInput, SensorField};
pub use reconciler::{reconcile, FillPolicy, ReconcileReport, Reconciler, Reconciliation};
pub use schema::{columns, Schema};
pub use vector::FeatureVector;
