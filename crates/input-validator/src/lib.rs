//! Input Validation
//!
//! Range checking for the readings the dashboard submits, applied before
//! they reach the feature reconciler.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{FieldDescriptor, FieldRange, ValidationConfig, ValidationResult, Validator};
