//! Model and Input Metadata Routes

use axum::{extract::State, Json};
use feature_reconciler::{FillPolicy, MachineType, RawInput};
use input_validator::FieldDescriptor;
use serde::Serialize;

use crate::{MismatchPolicy, SharedContext};

/// Response for the schema endpoint
#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    /// Columns the model expects, in order
    pub columns: Vec<String>,
    pub count: usize,
    pub fill_policy: FillPolicy,
    pub on_schema_mismatch: MismatchPolicy,
}

/// Response for the inputs endpoint
#[derive(Debug, Serialize)]
pub struct InputsResponse {
    pub fields: Vec<FieldDescriptor>,
    pub machine_types: Vec<&'static str>,
    pub defaults: RawInput,
}

/// Get the loaded model's schema
pub async fn get_schema(State(ctx): State<SharedContext>) -> Json<SchemaResponse> {
    let columns = ctx.engine.schema().columns().to_vec();
    Json(SchemaResponse {
        count: columns.len(),
        columns,
        fill_policy: ctx.reconciler.fill_policy(),
        on_schema_mismatch: ctx.mismatch_policy,
    })
}

/// Get slider ranges and defaults
pub async fn get_inputs(State(ctx): State<SharedContext>) -> Json<InputsResponse> {
    Json(InputsResponse {
        fields: ctx.validator.fields(),
        machine_types: MachineType::ALL.iter().map(|t| t.code()).collect(),
        defaults: ctx.validator.config().defaults(),
    })
}
