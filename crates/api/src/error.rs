//! Dashboard Error Types

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use feature_reconciler::ReconcileError;
use inference_engine::InferenceError;
use input_validator::ValidationResult;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced by the dashboard
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model artifact missing or unreadable
    #[error("{0}")]
    ModelUnavailable(InferenceError),

    /// Request body is not a well-formed set of readings
    #[error("Invalid request body: {message}")]
    InvalidRequest { status: StatusCode, message: String },

    /// Readings outside their documented domains
    #[error("Input validation failed with {} error(s)", .0.errors.len())]
    Validation(ValidationResult),

    /// Model columns that could not be populated
    #[error("{0}")]
    SchemaMismatch(ReconcileError),

    /// The model call itself failed
    #[error("{0}")]
    PredictionFailure(InferenceError),

    /// Listener or server I/O failure
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

impl DashboardError {
    /// Short machine readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardError::Config(_) => "config",
            DashboardError::ModelUnavailable(_) => "model_unavailable",
            DashboardError::InvalidRequest { .. } => "invalid_request",
            DashboardError::Validation(_) => "validation",
            DashboardError::SchemaMismatch(_) => "schema_mismatch",
            DashboardError::PredictionFailure(_) => "prediction_failure",
            DashboardError::Server(_) => "server",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DashboardError::InvalidRequest { status, .. } => *status,
            DashboardError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DashboardError::SchemaMismatch(_) => StatusCode::CONFLICT,
            DashboardError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DashboardError::Config(_)
            | DashboardError::PredictionFailure(_)
            | DashboardError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<config::ConfigError> for DashboardError {
    fn from(err: config::ConfigError) -> Self {
        DashboardError::Config(err.to_string())
    }
}

impl From<JsonRejection> for DashboardError {
    fn from(rejection: JsonRejection) -> Self {
        DashboardError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let details = match &self {
            DashboardError::Validation(result) => json!(result.errors),
            DashboardError::SchemaMismatch(ReconcileError::SchemaMismatch { missing }) => {
                json!({ "missing_columns": missing })
            }
            _ => serde_json::Value::Null,
        };

        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
            "details": details,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let mismatch = DashboardError::SchemaMismatch(ReconcileError::SchemaMismatch {
            missing: vec!["RNF".to_string()],
        });
        assert_eq!(mismatch.status(), StatusCode::CONFLICT);
        assert_eq!(mismatch.kind(), "schema_mismatch");
        assert_eq!(mismatch.to_string(), "Schema columns could not be populated: RNF");

        let failure = DashboardError::PredictionFailure(InferenceError::PredictionFailure(
            "bad dtype".to_string(),
        ));
        assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure.to_string(), "Prediction failed: bad dtype");
    }
}
